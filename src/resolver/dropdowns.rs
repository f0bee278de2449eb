use crate::database::models::{DropdownDefinition, Scope, ScopedOption};

/// System options first, then organization options, each in stored order.
///
/// Values are not de-duplicated across scopes; create paths reject
/// collisions instead, and consumers rely on the system-first ordering.
pub fn merge_dropdown(
    system: &DropdownDefinition,
    organization: &DropdownDefinition,
) -> Vec<ScopedOption> {
    let system_options = system.options.iter().map(|option| ScopedOption {
        option: option.clone(),
        scope: Scope::System,
    });
    let organization_options = organization.options.iter().map(|option| ScopedOption {
        option: option.clone(),
        scope: Scope::Organization,
    });

    system_options.chain(organization_options).collect()
}
