//! Human-readable descriptions and trace dumps of compositions.

use tracing::debug;

use super::{AccessPathKind, ComponentKind, Composition, IndexField, Injection};
use crate::ids::{AccessPathId, ComponentId, CompositeId, RoleId};
use crate::schema::Schema;

impl Composition {
    /// Describes a component, e.g. `Absorption (mandatory) in Person of Name in "Person has Name"`.
    #[must_use]
    pub fn inspect(&self, schema: &Schema, id: ComponentId) -> String {
        let component = self.component(id);
        let reading = |role: RoleId| {
            schema
                .reading_starting_with(role)
                .or_else(|| schema.preferred_reading(schema.role(role).fact_type))
                .map(|r| schema.expand_reading(r))
                .unwrap_or_default()
        };
        match &component.kind {
            ComponentKind::Indicator(indicator) => {
                format!("Indicator {:?}", reading(indicator.role))
            }
            ComponentKind::Discriminator(d) => format!(
                "Discriminator between {}",
                d.roles
                    .iter()
                    .map(|dr| format!("{:?}", reading(dr.role)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ComponentKind::Injection(Injection::ValueField) => format!(
                "ValueField {:?}",
                component
                    .object_type
                    .map(|t| schema.name(t))
                    .unwrap_or_default()
            ),
            kind => {
                let parent = component
                    .parent
                    .and_then(|p| self.component(p).name.as_deref())
                    .map(|name| format!(" in {name}"))
                    .unwrap_or_default();
                let name = component
                    .name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("<anonymous>");
                let mut text = format!("{} ({}){parent} of {name}", kind.label(), component.rank_kind());
                if let ComponentKind::Absorption(a) = kind {
                    if a.full_absorption.is_some() {
                        text.push_str(" (full)");
                    }
                    text.push_str(&format!(" in {:?}", reading(a.parent_role)));
                    if a.forward_absorption.is_some() {
                        text.push_str(" (reverse)");
                    } else if a.reverse_absorption.is_some() {
                        text.push_str(" (forward)");
                    }
                }
                text
            }
        }
    }

    /// Describes an index or foreign key.
    #[must_use]
    pub fn inspect_access_path(&self, schema: &Schema, id: AccessPathId) -> String {
        let ap = self.access_path(id);
        let name = ap
            .name
            .as_ref()
            .map(|n| format!(" {n:?}"))
            .unwrap_or_default();
        let target = self.composite_name(ap.composite);
        match &ap.kind {
            AccessPathKind::Index {
                is_unique,
                presence_constraint,
            } => {
                let kind = if !is_unique {
                    "Non-unique index"
                } else if self.composite(ap.composite).primary_index == Some(id) {
                    "Primary index"
                } else {
                    "Unique index"
                };
                let over = presence_constraint
                    .map(|pc| format!(" over {}", schema.describe_constraint(pc)))
                    .unwrap_or_default();
                format!("{kind}{name} to {target}{over}")
            }
            AccessPathKind::ForeignKey {
                source_composite,
                absorption,
                ..
            } => {
                let over = absorption
                    .map(|a| format!(" over {}", self.inspect(schema, a)))
                    .unwrap_or_default();
                format!(
                    "Foreign Key{name} from {} to {target}{over}",
                    self.composite_name(*source_composite)
                )
            }
        }
    }

    fn inspect_field(&self, schema: &Schema, label: &str, ordinal: usize, field: &IndexField) -> String {
        let root = self
            .root(field.component)
            .map(|c| self.composite_name(c).to_owned())
            .unwrap_or_default();
        let value = field
            .value
            .as_ref()
            .map(|v| format!(" discriminated by {v}"))
            .unwrap_or_default();
        format!(
            "{label} part {ordinal} in {root} references {}{value}",
            self.inspect(schema, field.component)
        )
    }

    /// Dumps a composite at `debug` level: columns by ordinal, then indices,
    /// inbound foreign keys and outbound foreign keys.
    pub fn show_trace(&self, schema: &Schema, composite: CompositeId) {
        let c = self.composite(composite);
        debug!(target: "orm::compose", "Composite {}", self.inspect(schema, c.mapping));
        self.trace_component(schema, c.mapping, 1);

        let mut indices: Vec<_> = c
            .access_paths
            .iter()
            .copied()
            .filter(|&ap| !self.access_path(ap).is_foreign_key())
            .collect();
        indices.sort_by_cached_key(|&ap| (c.primary_index != Some(ap), self.access_path(ap).name.clone(), ap));
        let inbound: Vec<_> = c
            .access_paths
            .iter()
            .copied()
            .filter(|&ap| self.access_path(ap).is_foreign_key())
            .collect();
        for (heading, group) in [
            ("Indices", &indices),
            ("Foreign keys inbound", &inbound),
            ("Foreign keys outbound", &c.foreign_keys_as_source),
        ] {
            if group.is_empty() {
                continue;
            }
            debug!(target: "orm::compose", "  {heading}");
            for &ap in group {
                self.trace_access_path(schema, ap);
            }
        }
    }

    fn trace_component(&self, schema: &Schema, id: ComponentId, depth: usize) {
        let component = self.component(id);
        let indent = "  ".repeat(depth);
        let ordinal = component
            .ordinal
            .map(|o| format!("{o}: "))
            .unwrap_or_default();
        let alias = match (&component.kind, &component.name) {
            (ComponentKind::Indicator(_) | ComponentKind::Discriminator(_), Some(name))
            | (ComponentKind::Injection(Injection::ValueField), Some(name)) => {
                format!(" (as {name:?})")
            }
            _ => String::new(),
        };
        debug!(target: "orm::compose", "{indent}{ordinal}{}{alias}", self.inspect(schema, id));
        if let ComponentKind::Absorption(a) = &component.kind {
            if a.nesting_mode.is_some() || !a.nestings.is_empty() {
                debug!(
                    target: "orm::compose",
                    "{indent}  Nested using {} mode",
                    a.nesting_mode.as_deref().unwrap_or("unspecified")
                );
                for (n, nesting) in a.nestings.iter().enumerate() {
                    let key = nesting
                        .key_name
                        .as_ref()
                        .map(|k| format!(" (as {k:?})"))
                        .unwrap_or_default();
                    debug!(
                        target: "orm::compose",
                        "{indent}    {n}: Nesting under {}{key} in {:?}",
                        schema.name(schema.role(nesting.index_role).player),
                        schema
                            .default_reading(schema.role(nesting.index_role).fact_type)
                            .unwrap_or_default()
                    );
                }
            }
        }
        for member in self.members_in_order(id) {
            self.trace_component(schema, member, depth + 1);
        }
    }

    fn trace_access_path(&self, schema: &Schema, id: AccessPathId) {
        let ap = self.access_path(id);
        debug!(target: "orm::compose", "    {}", self.inspect_access_path(schema, id));
        if let AccessPathKind::ForeignKey {
            foreign_key_fields, ..
        } = &ap.kind
        {
            for (n, field) in foreign_key_fields.iter().enumerate() {
                debug!(target: "orm::compose", "      {}", self.inspect_field(schema, "ForeignKeyField", n, field));
            }
        }
        for (n, field) in ap.index_fields.iter().enumerate() {
            debug!(target: "orm::compose", "      {}", self.inspect_field(schema, "IndexField", n, field));
        }
    }

    /// Describes an index field of an access path.
    #[must_use]
    pub fn inspect_index_field(&self, schema: &Schema, access_path: AccessPathId, ordinal: usize) -> String {
        self.access_path(access_path)
            .index_fields
            .get(ordinal)
            .map(|f| self.inspect_field(schema, "IndexField", ordinal, f))
            .unwrap_or_default()
    }

    /// Describes a foreign key field of an access path.
    #[must_use]
    pub fn inspect_foreign_key_field(&self, schema: &Schema, access_path: AccessPathId, ordinal: usize) -> String {
        match &self.access_path(access_path).kind {
            AccessPathKind::ForeignKey {
                foreign_key_fields, ..
            } => foreign_key_fields
                .get(ordinal)
                .map(|f| self.inspect_field(schema, "ForeignKeyField", ordinal, f))
                .unwrap_or_default(),
            AccessPathKind::Index { .. } => String::new(),
        }
    }
}
