//! # Bundled Scenarios
//!
//! Ready-made schemas and root functions driven by the CLI.
//!
//! - `genealogy` - parents/children and the ancestor/descendant closure
//! - `friends` - a self-exchanged friendship relation

pub mod friends;
pub mod genealogy;

use fixpoint_core::{Context, EntityId, Value};

/// Sorted `name` scalars of the entity elements of a relation.
pub(crate) fn sorted_names(ctx: &Context, entity: EntityId, attribute: &str) -> Vec<String> {
    let mut names: Vec<String> = ctx
        .related(entity, attribute)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|e| name_of(ctx, e))
        .collect();
    names.sort();
    names
}

/// The `name` scalar of an entity.
pub(crate) fn name_of(ctx: &Context, entity: EntityId) -> Option<String> {
    ctx.scalar(entity, "name")
        .ok()
        .and_then(Value::as_str)
        .map(String::from)
}
