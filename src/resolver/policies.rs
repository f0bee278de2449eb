use uuid::Uuid;

use crate::database::models::{EntityType, NewTagPolicy, PolicyEvaluation, TagPolicy};

/// Picks the policy that governs `entity_type` for one organization.
///
/// Storage allows several active policies per pair. The latest `created_at`
/// wins; identical timestamps fall back to the greatest id.
pub fn select_active_policy<'a>(
    policies: &'a [TagPolicy],
    organization_id: Uuid,
    entity_type: EntityType,
) -> Option<&'a TagPolicy> {
    policies
        .iter()
        .filter(|p| {
            p.is_active && p.organization_id == organization_id && p.entity_type == entity_type
        })
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}

/// Checks an entity's tags against a policy and applies its auto tags
pub fn evaluate_policy(
    policy: Option<&TagPolicy>,
    entity_type: EntityType,
    tags: &[String],
) -> PolicyEvaluation {
    let current = NewTagPolicy::normalize(tags);

    let Some(policy) = policy else {
        return PolicyEvaluation {
            policy_id: None,
            entity_type,
            compliant: true,
            missing_required: Vec::new(),
            auto_applied: Vec::new(),
            effective_tags: current,
        };
    };

    let auto_applied: Vec<String> = NewTagPolicy::normalize(&policy.auto_apply_tags)
        .into_iter()
        .filter(|t| !current.contains(t))
        .collect();

    let mut effective_tags = current;
    effective_tags.extend(auto_applied.iter().cloned());

    // Auto-applied tags count toward the requirement
    let missing_required: Vec<String> = NewTagPolicy::normalize(&policy.required_tags)
        .into_iter()
        .filter(|t| !effective_tags.contains(t))
        .collect();

    PolicyEvaluation {
        policy_id: Some(policy.id),
        entity_type,
        compliant: missing_required.is_empty(),
        missing_required,
        auto_applied,
        effective_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn policy(org: Uuid, entity_type: EntityType, created_secs: i64, active: bool) -> TagPolicy {
        TagPolicy {
            id: Uuid::new_v4(),
            organization_id: org,
            entity_type,
            required_tags: vec!["owner".to_string()],
            auto_apply_tags: vec!["triage".to_string()],
            is_active: active,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::seconds(created_secs),
        }
    }

    #[test]
    fn most_recent_active_policy_wins() {
        let org = Uuid::new_v4();
        let older = policy(org, EntityType::Incident, 0, true);
        let newer = policy(org, EntityType::Incident, 1, true);
        let policies = vec![newer.clone(), older];

        let selected = select_active_policy(&policies, org, EntityType::Incident);
        assert_eq!(selected.map(|p| p.id), Some(newer.id));
    }

    #[test]
    fn same_timestamp_breaks_tie_on_id_regardless_of_order() {
        let org = Uuid::new_v4();
        let a = policy(org, EntityType::Asset, 5, true);
        let b = policy(org, EntityType::Asset, 5, true);
        let expected = if a.id > b.id { a.id } else { b.id };

        let forward = vec![a.clone(), b.clone()];
        let backward = vec![b, a];
        assert_eq!(
            select_active_policy(&forward, org, EntityType::Asset).map(|p| p.id),
            Some(expected)
        );
        assert_eq!(
            select_active_policy(&backward, org, EntityType::Asset).map(|p| p.id),
            Some(expected)
        );
    }

    #[test]
    fn inactive_foreign_and_other_entity_policies_are_ignored() {
        let org = Uuid::new_v4();
        let policies = vec![
            policy(org, EntityType::Incident, 10, false),
            policy(Uuid::new_v4(), EntityType::Incident, 20, true),
            policy(org, EntityType::Runbook, 30, true),
        ];
        assert!(select_active_policy(&policies, org, EntityType::Incident).is_none());
    }

    #[test]
    fn evaluation_applies_auto_tags_and_reports_missing() {
        let org = Uuid::new_v4();
        let p = policy(org, EntityType::Incident, 0, true);
        let tags = vec!["Malware".to_string()];

        let eval = evaluate_policy(Some(&p), EntityType::Incident, &tags);
        assert_eq!(eval.policy_id, Some(p.id));
        assert!(!eval.compliant);
        assert_eq!(eval.missing_required, vec!["owner"]);
        assert_eq!(eval.auto_applied, vec!["triage"]);
        assert_eq!(eval.effective_tags, vec!["malware", "triage"]);
    }

    #[test]
    fn auto_tags_satisfy_requirements() {
        let org = Uuid::new_v4();
        let mut p = policy(org, EntityType::Asset, 0, true);
        p.required_tags = vec!["triage".to_string()];

        let eval = evaluate_policy(Some(&p), EntityType::Asset, &[]);
        assert!(eval.compliant);
        assert_eq!(eval.effective_tags, vec!["triage"]);
    }

    #[test]
    fn already_present_auto_tags_are_not_reported() {
        let org = Uuid::new_v4();
        let p = policy(org, EntityType::Incident, 0, true);
        let tags = vec!["owner".to_string(), "triage".to_string()];

        let eval = evaluate_policy(Some(&p), EntityType::Incident, &tags);
        assert!(eval.compliant);
        assert!(eval.auto_applied.is_empty());
    }

    #[test]
    fn no_policy_means_compliant() {
        let eval = evaluate_policy(None, EntityType::Exercise, &["x".to_string()]);
        assert!(eval.compliant);
        assert_eq!(eval.policy_id, None);
        assert_eq!(eval.effective_tags, vec!["x"]);
    }
}
