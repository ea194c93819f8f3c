//! Errors raised by schema construction and navigation.

use thiserror::Error;

/// A structural failure in the conceptual schema.
///
/// These signal a malformed schema or a misuse of the arena API; they are
/// not recoverable input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetamodelError {
    /// No role sequence qualifies as the entity's preferred identifier.
    #[error("no preferred identifier found for {0}")]
    NoPreferredIdentifier(String),

    /// An entity type was required.
    #[error("{0} is not an entity type")]
    NotAnEntityType(String),

    /// A value type was required.
    #[error("{0} is not a value type")]
    NotAValueType(String),

    /// The entity type does not objectify a fact type.
    #[error("{0} does not objectify a fact type")]
    NotObjectified(String),

    /// The fact type is already objectified by another entity type.
    #[error("fact type {0} is already objectified by {1}")]
    AlreadyObjectified(String, String),

    /// A fact type needs at least one role.
    #[error("a fact type must have at least one role")]
    NoRoles,

    /// A role sequence needs at least one role reference.
    #[error("a role sequence must reference at least one role")]
    EmptyRoleSequence,
}
