//! JSON serializer for compositions.
//!
//! Produces one object per composite, in name order, holding the mapping
//! tree, the flattened column list and the composite's access paths.

use serde_json::{json, Value};

use crate::composition::{AccessPathKind, ComponentKind, Composition, IndexField};
use crate::ids::{AccessPathId, ComponentId, CompositeId};
use crate::schema::Schema;

/// Serializes a composition to a JSON `Value`.
#[must_use]
pub fn to_json(schema: &Schema, composition: &Composition) -> Value {
    let composites: Vec<Value> = composition
        .all_composite_by_name()
        .into_iter()
        .map(|c| composite_to_json(schema, composition, c))
        .collect();
    json!({
        "name": composition.name,
        "composites": composites
    })
}

/// Serializes a composition to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_string(schema: &Schema, composition: &Composition) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&to_json(schema, composition))
}

fn composite_to_json(schema: &Schema, composition: &Composition, id: CompositeId) -> Value {
    let composite = composition.composite(id);
    let columns: Vec<Value> = composition
        .leaves(composite.mapping)
        .into_iter()
        .filter(|&leaf| leaf != composite.mapping)
        .map(|leaf| {
            json!({
                "name": composition.column_name(leaf),
                "kind": composition.component(leaf).kind.label(),
                "rank_path": composition.rank_path(leaf),
            })
        })
        .collect();
    let access_paths: Vec<Value> = composite
        .access_paths
        .iter()
        .chain(&composite.foreign_keys_as_source)
        .map(|&ap| access_path_to_json(composition, id, ap))
        .collect();
    json!({
        "name": composition.composite_name(id),
        "object_type": composition
            .component(composite.mapping)
            .object_type
            .map(|t| schema.name(t)),
        "mapping": component_to_json(schema, composition, composite.mapping),
        "columns": columns,
        "access_paths": access_paths
    })
}

fn component_to_json(schema: &Schema, composition: &Composition, id: ComponentId) -> Value {
    let component = composition.component(id);
    let members: Vec<Value> = composition
        .members_in_order(id)
        .into_iter()
        .map(|m| component_to_json(schema, composition, m))
        .collect();
    let mut value = json!({
        "kind": component.kind.label(),
        "name": component.name,
        "ordinal": component.ordinal,
        "rank": component.rank_kind(),
        "object_type": component.object_type.map(|t| schema.name(t)),
    });
    if let (Value::Object(map), ComponentKind::Absorption(a)) = (&mut value, &component.kind) {
        map.insert("parent_role".to_owned(), json!(schema.role_name(a.parent_role)));
        map.insert("child_role".to_owned(), json!(schema.role_name(a.child_role)));
        map.insert("flattens".to_owned(), json!(a.flattens));
        map.insert("full".to_owned(), json!(a.full_absorption.is_some()));
    }
    if let Value::Object(map) = &mut value {
        if !members.is_empty() {
            map.insert("members".to_owned(), Value::Array(members));
        }
    }
    value
}

fn fields_to_json(composition: &Composition, fields: &[IndexField]) -> Vec<Value> {
    fields
        .iter()
        .map(|f| json!(composition.column_name(f.component)))
        .collect()
}

fn access_path_to_json(composition: &Composition, owner: CompositeId, id: AccessPathId) -> Value {
    let ap = composition.access_path(id);
    let fields = fields_to_json(composition, &ap.index_fields);
    match &ap.kind {
        AccessPathKind::Index { is_unique, .. } => json!({
            "type": "index",
            "name": ap.name,
            "unique": is_unique,
            "primary": composition.composite(ap.composite).primary_index == Some(id),
            "natural": composition.composite(ap.composite).natural_index == Some(id),
            "fields": fields
        }),
        AccessPathKind::ForeignKey {
            source_composite,
            foreign_key_fields,
            ..
        } => {
            let direction = if *source_composite == owner {
                "foreign_key_outbound"
            } else {
                "foreign_key_inbound"
            };
            json!({
                "type": direction,
                "from": composition.composite_name(*source_composite),
                "to": composition.composite_name(ap.composite),
                "fields": fields_to_json(composition, foreign_key_fields),
                "references": fields
            })
        }
    }
}
