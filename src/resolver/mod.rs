//! Pure merge logic for effective configuration.
//!
//! Nothing in here touches storage or the cache: inputs are borrowed,
//! outputs are fresh values, and the same inputs always give the same
//! output.

pub mod dropdowns;
pub mod policies;
pub mod tags;

pub use dropdowns::merge_dropdown;
pub use policies::{evaluate_policy, select_active_policy};
pub use tags::merge_tags;
