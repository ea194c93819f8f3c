//! Member validator: names, absorptions, indicators and discriminators,
//! recursively through nested absorptions.

use std::collections::BTreeMap;

use orm_metamodel::{Absorption, ComponentId, ComponentKind, ObjectTypeId};

use super::Context;
use crate::report::Problem;

/// Validates the members of `mapping`, descending into absorptions.
pub fn validate(cx: &mut Context<'_, '_>, mapping: ComponentId) {
    let (schema, composition) = (cx.schema, cx.composition);
    let parent = composition.component(mapping);
    let parent_type = parent.object_type;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &member in &parent.members {
        let component = composition.component(member);
        let crosses_inheritance = component
            .as_absorption()
            .is_some_and(|a| schema.type_inheritance(schema.role(a.parent_role).fact_type).is_some());
        if let (Some(name), false) = (component.name.as_deref(), crosses_inheritance) {
            *counts.entry(name).or_default() += 1;
        }
    }
    let duplicates: Vec<String> = counts
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(name, _)| format!("{name:?}"))
        .collect();
    if !duplicates.is_empty() {
        cx.report(Problem::fail(
            mapping,
            format!("Contains duplicated names {}", duplicates.join(", ")),
        ));
    }

    for &member in &parent.members {
        let component = composition.component(member);
        let flattens = component.as_absorption().is_some_and(|a| a.flattens);
        if !flattens && component.name.as_deref().is_none_or(str::is_empty) {
            cx.report(Problem::fail(member, "Requires a name"));
        }

        match &component.kind {
            ComponentKind::Absorption(absorption) => {
                validate_absorption(cx, member, absorption, parent_type);
                validate(cx, member);
            }
            ComponentKind::Scoping => {
                cx.report(Problem::warn(member, "Unexpected and unchecked Scoping"));
            }
            ComponentKind::Injection(_) => {}
            ComponentKind::Mapping => {
                cx.report(Problem::fail(member, "A child Component should not be a bare Mapping"));
            }
            ComponentKind::Indicator(indicator) => {
                let player = schema.role(indicator.role).player;
                if parent_type.is_some_and(|t| !schema.supertypes_transitive(t).contains(&player)) {
                    cx.report(Problem::fail(
                        member,
                        format!(
                            "Indicator role {} is not played by parent object type {}",
                            schema.role_name(indicator.role),
                            parent_type.map(|t| schema.name(t)).unwrap_or_default()
                        ),
                    ));
                }
            }
            ComponentKind::Discriminator(discriminator) => {
                if discriminator.roles.is_empty() {
                    cx.report(Problem::fail(
                        member,
                        "Discriminator requires at least one Discriminated Role",
                    ));
                }
                for dr in &discriminator.roles {
                    if Some(schema.role(dr.role).player) != parent_type {
                        cx.report(Problem::fail(
                            member,
                            format!(
                                "Discriminated Role {} is not played by parent object type {}",
                                schema.role_name(dr.role),
                                parent_type.map(|t| schema.name(t)).unwrap_or_default()
                            ),
                        ));
                    }
                }
            }
        }
    }
}

fn validate_absorption(
    cx: &mut Context<'_, '_>,
    member: ComponentId,
    absorption: &Absorption,
    parent_type: Option<ObjectTypeId>,
) {
    let (schema, composition) = (cx.schema, cx.composition);
    let (p, c) = (absorption.parent_role, absorption.child_role);
    let (parent_fact_type, child_fact_type) = (schema.role(p).fact_type, schema.role(c).fact_type);
    if parent_fact_type != child_fact_type {
        cx.report(Problem::fail(
            member,
            format!(
                "Roles should belong to the same fact type, but instead we have {} in {} and {} in {}",
                schema.role_name(p),
                schema.describe_fact_type(parent_fact_type),
                schema.role_name(c),
                schema.describe_fact_type(child_fact_type)
            ),
        ));
    }

    let object_type = composition.component(member).object_type;
    if object_type != Some(schema.role(c).player) {
        cx.report(Problem::fail(
            member,
            format!(
                "Object type {} should play the child role {}",
                object_type.map(|t| schema.name(t)).unwrap_or("<none>"),
                schema.role_name(c)
            ),
        ));
    }
    if parent_type != Some(schema.role(p).player) {
        cx.report(Problem::fail(
            member,
            format!(
                "Parent mapping object type {} should play the parent role {}",
                parent_type.map(|t| schema.name(t)).unwrap_or("<none>"),
                schema.role_name(p)
            ),
        ));
    }

    if let Some(mirror) = absorption.mirror().and_then(|m| composition.absorption(m)) {
        if mirror.child_role != p {
            cx.report(Problem::fail(
                member,
                format!(
                    "Opposite absorption's child role {} should match parent role {}",
                    schema.role_name(mirror.child_role),
                    schema.role_name(p)
                ),
            ));
        }
        if mirror.parent_role != c {
            cx.report(Problem::fail(
                member,
                format!(
                    "Opposite absorption's parent role {} should match child role {}",
                    schema.role_name(mirror.parent_role),
                    schema.role_name(c)
                ),
            ));
        }
    }

    if !absorption.nestings.is_empty() {
        cx.report(Problem::warn(member, "Unexpected and unchecked Nesting"));
        if absorption.nesting_mode.is_none() {
            cx.report(Problem::fail(member, "Nesting Mode must be specified"));
        }
    }
}
