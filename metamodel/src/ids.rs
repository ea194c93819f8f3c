//! Opaque arena identifiers.
//!
//! Every node of a [`Schema`](crate::Schema) or [`Composition`](crate::Composition)
//! is addressed by a small copyable id. Relationships between nodes (role and
//! fact type, component and parent, absorption and mirror) are stored as ids
//! and resolved through the owning arena, so cyclic references never own
//! each other.

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        pub struct $name(u32);

        impl $name {
            /// Returns the arena slot addressed by this id.
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $tag, self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies an entity type or value type.
    ObjectTypeId,
    "ObjectType"
);
arena_id!(
    /// Identifies a fact type (plain, type inheritance or link).
    FactTypeId,
    "FactType"
);
arena_id!(
    /// Identifies a role (including mirror roles).
    RoleId,
    "Role"
);
arena_id!(
    /// Identifies an ordered sequence of role references.
    RoleSequenceId,
    "RoleSequence"
);
arena_id!(
    /// Identifies a presence constraint.
    ConstraintId,
    "PresenceConstraint"
);
arena_id!(
    /// Identifies a value constraint.
    ValueConstraintId,
    "ValueConstraint"
);
arena_id!(
    /// Identifies a reading of a fact type.
    ReadingId,
    "Reading"
);
arena_id!(
    /// Identifies a composite (one physical table).
    CompositeId,
    "Composite"
);
arena_id!(
    /// Identifies a component of a composite's mapping tree.
    ComponentId,
    "Component"
);
arena_id!(
    /// Identifies an index or foreign key.
    AccessPathId,
    "AccessPath"
);
arena_id!(
    /// Identifies a full absorption record.
    FullAbsorptionId,
    "FullAbsorption"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_their_index() {
        let id = RoleId::from_index(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "Role#7");
    }

    #[test]
    fn ids_order_by_creation() {
        assert!(ComponentId::from_index(1) < ComponentId::from_index(2));
    }
}
