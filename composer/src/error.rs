//! Errors raised while planning, ranking and typing a composition.

use orm_metamodel::MetamodelError;
use thiserror::Error;

/// A failure while composing a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// `flip` was asked to reverse an absorption that has no mirror.
    #[error("absorption {0} has no mirror to flip")]
    NoMirror(String),

    /// Full absorptions fix their direction.
    #[error("absorption {0} is a full absorption and cannot be flipped")]
    FullAbsorptionNotFlippable(String),

    /// A column type was requested for a component that is not a column.
    #[error("unsupported component for a column: {0}")]
    UnsupportedComponent(String),

    /// A bare mapping or root has no rank among siblings.
    #[error("component cannot be ranked: {0}")]
    UnrankableComponent(String),

    /// Following preferred identifiers led back to an entity already being identified.
    #[error("identification of {0} is circular")]
    IdentificationCycle(String),

    /// No column was found for the natural key of a composite.
    #[error("natural index of {0} has no fields")]
    EmptyIndex(String),

    /// The conceptual schema is malformed.
    #[error(transparent)]
    Metamodel(#[from] MetamodelError),
}
