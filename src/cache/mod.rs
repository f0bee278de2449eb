//! Process-wide TTL cache for merged configuration.
//!
//! The cache is memoization only, never a source of truth. Entries are
//! replaced whole under the write lock, so a reader sees either the old
//! entry or the new one. Expired entries read as absent and are evicted on
//! the way out; `purge_expired` sweeps the rest.
//!
//! Every invalidation stamps a new generation. A fill computed from data
//! read before the stamp is refused by `set_if_generation`.

pub mod clock;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub use clock::{Clock, ManualClock, SystemClock};

/// Resource kinds that get their own key namespace and TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Dropdown,
    EffectiveTags,
    TagPolicy,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Dropdown => "dropdown",
            ResourceKind::EffectiveTags => "tags",
            ResourceKind::TagPolicy => "tag_policy",
        }
    }
}

/// Cache key namespaced by organization, resource kind and category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub organization_id: Uuid,
    pub kind: ResourceKind,
    pub category: String,
}

impl CacheKey {
    pub fn new(organization_id: Uuid, kind: ResourceKind, category: impl Into<String>) -> Self {
        Self {
            organization_id,
            kind,
            category: category.into(),
        }
    }

    /// Prefix shared by every key of one organization
    pub fn organization_prefix(organization_id: Uuid) -> String {
        format!("org:{}:", organization_id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "org:{}:{}:{}",
            self.organization_id,
            self.kind.as_str(),
            self.category
        )
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: DateTime<Utc>,
}

/// Invalidation stamp for a key or prefix
pub type Generation = u64;

struct Slots<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // Latest invalidation stamp per exact key or per prefix
    stamps: HashMap<String, Generation>,
    next_stamp: Generation,
}

impl<V> Slots<V> {
    fn generation(&self, key: &str) -> Generation {
        self.stamps
            .iter()
            .filter(|(mark, _)| key.starts_with(mark.as_str()))
            .map(|(_, stamp)| *stamp)
            .max()
            .unwrap_or(0)
    }

    fn stamp(&mut self, mark: &str) {
        self.next_stamp += 1;
        self.stamps.insert(mark.to_string(), self.next_stamp);
    }
}

pub struct CacheStore<V> {
    slots: RwLock<Slots<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> CacheStore<V>
where
    V: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: HashMap::new(),
                stamps: HashMap::new(),
                next_stamp: 0,
            }),
            clock,
        }
    }

    /// Returns the value only while `now < expires_at`
    pub async fn get(&self, key: &str) -> Option<Arc<V>> {
        let now = self.clock.now();
        {
            let slots = self.slots.read().await;
            match slots.entries.get(key) {
                None => return None,
                Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict unless a concurrent `set` already refreshed it
        let mut slots = self.slots.write().await;
        if let Some(entry) = slots.entries.get(key) {
            if self.clock.now() >= entry.expires_at {
                slots.entries.remove(key);
            }
        }
        None
    }

    /// Current invalidation generation of `key`; pass it to `set_if_generation`
    /// after loading the value it guards
    pub async fn generation(&self, key: &str) -> Generation {
        self.slots.read().await.generation(key)
    }

    fn entry(&self, value: V, ttl_secs: u64) -> CacheEntry<V> {
        let now = self.clock.now();
        // chrono durations top out at i64::MAX milliseconds
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        let ttl = Duration::seconds(secs);
        CacheEntry {
            value: Arc::new(value),
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: V, ttl_secs: u64) {
        let entry = self.entry(value, ttl_secs);
        self.slots.write().await.entries.insert(key.into(), entry);
    }

    /// Stores the value unless `key` was invalidated since `generation` was read.
    /// Returns whether the value was stored.
    pub async fn set_if_generation(
        &self,
        key: impl Into<String>,
        generation: Generation,
        value: V,
        ttl_secs: u64,
    ) -> bool {
        let key = key.into();
        let entry = self.entry(value, ttl_secs);
        let mut slots = self.slots.write().await;
        if slots.generation(&key) != generation {
            tracing::debug!("Dropped stale cache fill for {}", key);
            return false;
        }
        slots.entries.insert(key, entry);
        true
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        let mut slots = self.slots.write().await;
        slots.stamp(key);
        slots.entries.remove(key).is_some()
    }

    /// Drops every key starting with `prefix`, returning how many went
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut slots = self.slots.write().await;
        slots.stamp(prefix);
        let before = slots.entries.len();
        slots.entries.retain(|key, _| !key.starts_with(prefix));
        before - slots.entries.len()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.write().await;
        let before = slots.entries.len();
        slots.entries.retain(|_, entry| now < entry.expires_at);
        before - slots.entries.len()
    }

    /// Number of stored entries, expired ones included until they are swept
    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Periodically sweeps expired entries until the handle is aborted
    pub fn spawn_purger(self: Arc<Self>, every: StdDuration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let purged = self.purge_expired().await;
                if purged > 0 {
                    tracing::debug!("Purged {} expired cache entries", purged);
                }
            }
        })
    }
}

impl<V> Default for CacheStore<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_clock() -> (CacheStore<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (CacheStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let (cache, _clock) = store_with_clock();
        cache.set("k", "v".to_string(), 60).await;
        assert_eq!(cache.get("k").await.as_deref(), Some(&"v".to_string()));
    }

    #[tokio::test]
    async fn entry_expires_exactly_at_ttl() {
        let (cache, clock) = store_with_clock();
        cache.set("k", "v".to_string(), 60).await;

        clock.advance_secs(59);
        assert!(cache.get("k").await.is_some());

        clock.advance_secs(1);
        assert!(cache.get("k").await.is_none());
        // Expired read evicts
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn zero_ttl_is_never_readable() {
        let (cache, _clock) = store_with_clock();
        cache.set("k", "v".to_string(), 0).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn set_overwrites_and_refreshes_expiry() {
        let (cache, clock) = store_with_clock();
        cache.set("k", "old".to_string(), 10).await;
        clock.advance_secs(8);
        cache.set("k", "new".to_string(), 10).await;
        clock.advance_secs(8);
        assert_eq!(cache.get("k").await.as_deref(), Some(&"new".to_string()));
    }

    #[tokio::test]
    async fn huge_ttl_does_not_overflow() {
        let (cache, _clock) = store_with_clock();
        cache.set("k", "v".to_string(), u64::MAX).await;
        assert!(cache.get("k").await.is_some());
    }

    #[tokio::test]
    async fn invalidate_prefix_only_touches_one_organization() {
        let (cache, _clock) = store_with_clock();
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        let a1 = CacheKey::new(org_a, ResourceKind::Dropdown, "severity_levels");
        let a2 = CacheKey::new(org_a, ResourceKind::EffectiveTags, "effective");
        let b1 = CacheKey::new(org_b, ResourceKind::Dropdown, "severity_levels");
        for key in [&a1, &a2, &b1] {
            cache.set(key.to_string(), "x".to_string(), 60).await;
        }

        let removed = cache
            .invalidate_prefix(&CacheKey::organization_prefix(org_a))
            .await;
        assert_eq!(removed, 2);
        assert!(cache.get(&b1.to_string()).await.is_some());
        assert!(cache.get(&a1.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn purge_expired_keeps_live_entries() {
        let (cache, clock) = store_with_clock();
        cache.set("short", "a".to_string(), 5).await;
        cache.set("long", "b".to_string(), 500).await;
        clock.advance_secs(10);
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("long").await.is_some());
    }

    #[tokio::test]
    async fn invalidate_reports_presence() {
        let (cache, _clock) = store_with_clock();
        cache.set("k", "v".to_string(), 60).await;
        assert!(cache.invalidate("k").await);
        assert!(!cache.invalidate("k").await);
    }

    #[tokio::test]
    async fn fill_after_invalidation_is_dropped() {
        let (cache, _clock) = store_with_clock();
        let generation = cache.generation("k").await;
        cache.invalidate("k").await;
        assert!(!cache.set_if_generation("k", generation, "stale".to_string(), 60).await);
        assert!(cache.get("k").await.is_none());

        let generation = cache.generation("k").await;
        assert!(cache.set_if_generation("k", generation, "fresh".to_string(), 60).await);
        assert_eq!(cache.get("k").await.as_deref(), Some(&"fresh".to_string()));
    }

    #[tokio::test]
    async fn prefix_invalidation_moves_generation_of_covered_keys() {
        let (cache, _clock) = store_with_clock();
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        let a = CacheKey::new(org_a, ResourceKind::Dropdown, "custom").to_string();
        let b = CacheKey::new(org_b, ResourceKind::Dropdown, "custom").to_string();
        let gen_a = cache.generation(&a).await;
        let gen_b = cache.generation(&b).await;

        cache
            .invalidate_prefix(&CacheKey::organization_prefix(org_a))
            .await;

        assert!(!cache.set_if_generation(a, gen_a, "x".to_string(), 60).await);
        assert!(cache.set_if_generation(b, gen_b, "x".to_string(), 60).await);
    }

    #[test]
    fn key_format_is_namespaced() {
        let org = Uuid::nil();
        let key = CacheKey::new(org, ResourceKind::TagPolicy, "incident");
        assert_eq!(
            key.to_string(),
            "org:00000000-0000-0000-0000-000000000000:tag_policy:incident"
        );
        assert!(key.to_string().starts_with(&CacheKey::organization_prefix(org)));
    }

    #[tokio::test(start_paused = true)]
    async fn purger_sweeps_in_background() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(CacheStore::<String>::with_clock(clock.clone()));
        cache.set("k", "v".to_string(), 1).await;
        clock.advance_secs(5);

        let handle = cache.clone().spawn_purger(StdDuration::from_secs(30));
        tokio::time::sleep(StdDuration::from_secs(31)).await;
        assert_eq!(cache.len().await, 0);
        handle.abort();
    }
}
