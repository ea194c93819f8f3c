//! Fact-based conceptual schemas and their relational compositions, as
//! typed Rust data.
//!
//! A [`Schema`] holds object types, fact types, roles, role sequences,
//! presence and value constraints, and readings, all addressed by opaque
//! arena ids. A [`Composition`] holds the tree of components that maps a
//! schema onto composites (tables, documents), together with their indices
//! and foreign keys.
//!
//! # Entry Point
//!
//! ```
//! use orm_metamodel::Schema;
//!
//! let mut schema = Schema::new();
//! let person = schema.add_entity_type("Person");
//! let name = schema.add_value_type("PersonName");
//! let ft = schema.add_fact_type(&[person, name])?;
//! let roles = schema.fact_type(ft).roles.clone();
//! schema.add_uniqueness_constraint(&roles[..1], false)?;
//! let pi = schema.add_uniqueness_constraint(&roles[1..], true)?;
//! assert_eq!(schema.preferred_identifier(person)?, pi);
//! # Ok::<(), orm_metamodel::MetamodelError>(())
//! ```
//!
//! # Data types
//!
//! [`datatypes`] maps type names onto [`SemanticType`]s and picks the
//! narrowest integer representation a [`DataTypeContext`] offers for a
//! value constraint.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod composition;
pub mod datatypes;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod ids;
mod identification;
mod inheritance;
pub mod model;
mod roles;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serializer;
pub mod support;

pub use composition::{
    AccessPath, AccessPathKind, Absorption, Component, ComponentKind, Composite, Composition,
    DiscriminatedRole, Discriminator, FullAbsorption, IndexField, Indicator, Injection, Nesting,
    RankCategory, RankKey,
};
pub use datatypes::{DataTypeContext, IntegerRange, IntegerType, SemanticType, SqlContext};
pub use error::MetamodelError;
pub use ids::{
    AccessPathId, ComponentId, CompositeId, ConstraintId, FactTypeId, FullAbsorptionId,
    ObjectTypeId, ReadingId, RoleId, RoleSequenceId, ValueConstraintId,
};
pub use model::{
    Assimilation, Bound, EntityType, FactType, FactTypeKind, ObjectType, ObjectTypeKind,
    PresenceConstraint, Reading, Role, RoleRef, RoleSequence, TypeInheritance, Value,
    ValueConstraint, ValueRange, ValueType,
};
pub use schema::Schema;
pub use support::Words;
