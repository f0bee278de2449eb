pub mod dropdown;
pub mod membership;
pub mod tag;
pub mod tag_policy;

pub use dropdown::{
    DropdownCategory, DropdownDefinition, DropdownOption, NewDropdownOption, Scope, ScopedOption,
    UnknownCategory,
};
pub use membership::{MemberRole, Membership};
pub use tag::{EffectiveTags, NewTag, TagCategory, TagDefinition, TagSet, TagTemplate};
pub use tag_policy::{EntityType, NewTagPolicy, PolicyEvaluation, TagPolicy};
