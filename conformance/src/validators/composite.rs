//! Composite validator: the root mapping and everything below it.

use orm_metamodel::{ComponentKind, CompositeId};
use tracing::debug;

use super::{access_paths, members, Context};
use crate::report::Problem;

/// Validates a composite's root mapping, its members and its access paths.
pub fn validate(cx: &mut Context<'_, '_>, composite: CompositeId) {
    let composition = cx.composition;
    debug!(
        target: "orm::validate",
        composite = composition.composite_name(composite),
        "validating"
    );
    let root = composition.composite(composite).mapping;
    let mapping = composition.component(root);

    if !matches!(mapping.kind, ComponentKind::Mapping) {
        cx.report(Problem::fail(composite, "Mapping is not a mapping"));
    }
    if mapping.object_type.is_none() {
        cx.report(Problem::fail(root, "Has no ObjectType"));
    }
    if mapping.name.as_deref().is_none_or(str::is_empty) {
        cx.report(Problem::fail(root, "Has no Name"));
    }
    if mapping.ordinal.is_some() {
        cx.report(Problem::fail(root, "Should not have an Ordinal rank"));
    }
    if mapping.parent.is_some() {
        cx.report(Problem::fail(root, "Should not have a parent mapping"));
    }
    if mapping.composite != Some(composite) {
        cx.report(Problem::fail(root, "Should be the root of its mapping"));
    }

    members::validate(cx, root);
    access_paths::validate(cx, composite);
}
