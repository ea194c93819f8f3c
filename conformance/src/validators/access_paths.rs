//! Access path validator: index fields, and the pairing of foreign key
//! fields with the index fields they reference.

use orm_metamodel::{AccessPathId, AccessPathKind, ComponentKind, CompositeId, IndexField, Injection};

use super::Context;
use crate::report::Problem;

/// Validates every index and foreign key held by `composite`.
pub fn validate(cx: &mut Context<'_, '_>, composite: CompositeId) {
    let composition = cx.composition;
    for &id in &composition.composite(composite).access_paths {
        let access_path = composition.access_path(id);
        if access_path.index_fields.is_empty() {
            cx.report(Problem::fail(id, "Must contain at least one IndexField"));
        }
        for (ordinal, field) in access_path.index_fields.iter().enumerate() {
            if !is_column(cx, field) {
                cx.report(Problem::fail(
                    id,
                    format!(
                        "{} must be an Indicator or played by a ValueType",
                        composition.inspect_index_field(cx.schema, id, ordinal)
                    ),
                ));
            }
            if composition.root(field.component) != Some(composite) {
                cx.report(Problem::fail(
                    id,
                    format!(
                        "{} must be within its composite",
                        composition.inspect_index_field(cx.schema, id, ordinal)
                    ),
                ));
            }
        }
        if let AccessPathKind::ForeignKey {
            source_composite,
            foreign_key_fields,
            ..
        } = &access_path.kind
        {
            validate_foreign_key(cx, id, *source_composite, &access_path.index_fields, foreign_key_fields);
        }
    }
}

/// Indicators, value-typed components and injected keys are columns.
fn is_column(cx: &Context<'_, '_>, field: &IndexField) -> bool {
    let component = cx.composition.component(field.component);
    match &component.kind {
        ComponentKind::Indicator(_) => true,
        ComponentKind::Injection(Injection::SurrogateKey | Injection::ValidFrom) => true,
        _ => component
            .object_type
            .is_some_and(|t| cx.schema.object_type(t).is_value_type()),
    }
}

fn validate_foreign_key(
    cx: &mut Context<'_, '_>,
    id: AccessPathId,
    source: CompositeId,
    index_fields: &[IndexField],
    foreign_key_fields: &[IndexField],
) {
    let (schema, composition) = (cx.schema, cx.composition);
    if index_fields.len() != foreign_key_fields.len() {
        cx.report(Problem::fail(
            id,
            format!(
                "has {} index fields but {} ForeignKeyField",
                index_fields.len(),
                foreign_key_fields.len()
            ),
        ));
        return;
    }

    for (ordinal, (index_field, fk_field)) in index_fields.iter().zip(foreign_key_fields).enumerate() {
        let (target, referencing) = (
            composition.component(index_field.component),
            composition.component(fk_field.component),
        );
        if target.kind.label() != referencing.kind.label() {
            cx.report(Problem::fail(
                id,
                format!(
                    "Column {}({}) does not match {}({})",
                    composition.column_name(fk_field.component),
                    referencing.kind.label(),
                    composition.column_name(index_field.component),
                    target.kind.label()
                ),
            ));
        } else if matches!(target.kind, ComponentKind::Absorption(_)) && target.object_type != referencing.object_type {
            cx.report(Problem::fail(
                id,
                format!(
                    "{} must have matching target type",
                    composition.inspect_index_field(schema, id, ordinal)
                ),
            ));
        }
        if composition.root(fk_field.component) != Some(source) {
            cx.report(Problem::fail(
                id,
                format!(
                    "{} must be within the source composite",
                    composition.inspect_foreign_key_field(schema, id, ordinal)
                ),
            ));
        }
    }
}
