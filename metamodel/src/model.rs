//! Conceptual schema node types.
//!
//! These types describe a fact-based conceptual schema as typed Rust data.
//! Every node lives in a [`Schema`](crate::Schema) arena and refers to its
//! neighbours by id; the arena keeps both directions of each relationship
//! in step.

use std::cell::Cell;
use std::fmt;

use crate::ids::{
    ConstraintId, FactTypeId, ObjectTypeId, ReadingId, RoleId, RoleSequenceId, ValueConstraintId,
};

/// The strategy chosen for mapping a subtype relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum Assimilation {
    /// The subtype is absorbed into its supertype's table.
    Absorbed,
    /// The subtype gets its own table.
    Separate,
    /// The supertype's table is partitioned into one table per subtype.
    Partitioned,
}

impl Assimilation {
    /// Returns the annotation text for this assimilation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Assimilation::Absorbed => "absorbed",
            Assimilation::Separate => "separate",
            Assimilation::Partitioned => "partitioned",
        }
    }

    /// Parses an assimilation annotation. Returns `None` if unrecognised.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "absorbed" => Some(Assimilation::Absorbed),
            "separate" => Some(Assimilation::Separate),
            "partitioned" => Some(Assimilation::Partitioned),
            _ => None,
        }
    }

    /// True unless the subtype is absorbed into its supertype.
    #[must_use]
    pub fn is_separating(self) -> bool {
        !matches!(self, Assimilation::Absorbed)
    }
}

/// An entity type or value type: the players of roles.
#[derive(Debug, Clone)]
pub struct ObjectType {
    /// Unique name within the schema.
    pub name: String,
    /// Instances may exist without playing any role.
    pub is_independent: bool,
    /// Mapping annotations attached to the concept (e.g. `"separate"`).
    pub mapping_annotations: Vec<String>,
    /// Roles played by this object type, in creation order.
    pub roles: Vec<RoleId>,
    /// Entity or value specific attributes.
    pub kind: ObjectTypeKind,
}

impl ObjectType {
    /// True if the concept carries the given mapping annotation.
    #[must_use]
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.mapping_annotations.iter().any(|a| a == annotation)
    }

    /// Returns the entity payload, if this is an entity type.
    #[must_use]
    pub fn as_entity(&self) -> Option<&EntityType> {
        match &self.kind {
            ObjectTypeKind::Entity(e) => Some(e),
            ObjectTypeKind::Value(_) => None,
        }
    }

    /// Returns the value payload, if this is a value type.
    #[must_use]
    pub fn as_value(&self) -> Option<&ValueType> {
        match &self.kind {
            ObjectTypeKind::Value(v) => Some(v),
            ObjectTypeKind::Entity(_) => None,
        }
    }

    /// True for value types.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, ObjectTypeKind::Value(_))
    }

    /// True for entity types.
    #[must_use]
    pub fn is_entity_type(&self) -> bool {
        matches!(self.kind, ObjectTypeKind::Entity(_))
    }
}

/// Entity or value attributes of an [`ObjectType`].
#[derive(Debug, Clone)]
pub enum ObjectTypeKind {
    /// An entity type.
    Entity(EntityType),
    /// A value type.
    Value(ValueType),
}

/// Attributes specific to entity types.
#[derive(Debug, Clone, Default)]
pub struct EntityType {
    /// The fact type this entity objectifies, if any.
    pub objectified_fact_type: Option<FactTypeId>,
    /// Type inheritance fact types in which this entity is the subtype, in declaration order.
    pub supertype_inheritances: Vec<FactTypeId>,
    /// Type inheritance fact types in which this entity is the supertype, in declaration order.
    pub subtype_inheritances: Vec<FactTypeId>,
    pub(crate) preferred_identifier: Cell<Option<ConstraintId>>,
}

/// Attributes specific to value types.
#[derive(Debug, Clone, Default)]
pub struct ValueType {
    /// The value type this one refines.
    pub supertype: Option<ObjectTypeId>,
    /// Direct value subtypes.
    pub subtypes: Vec<ObjectTypeId>,
    /// Declared length (bits for numbers, characters for text).
    pub length: Option<u32>,
    /// Declared scale (fractional digits).
    pub scale: Option<u32>,
    /// Unit of measure.
    pub unit: Option<String>,
    /// Transaction phase at which values are auto-assigned (`"assert"` or `"commit"`).
    pub transaction_phase: Option<String>,
    /// Restriction on permitted values.
    pub value_constraint: Option<ValueConstraintId>,
}

/// A relationship type with ordered roles and readings.
#[derive(Debug, Clone)]
pub struct FactType {
    /// Roles in ordinal order.
    pub roles: Vec<RoleId>,
    /// Readings in creation order.
    pub readings: Vec<ReadingId>,
    /// The entity type objectifying this fact type.
    pub entity_type: Option<ObjectTypeId>,
    /// Name of the query this fact type is derived from, if it is derived.
    pub derived_from: Option<String>,
    /// Plain, type inheritance or link fact type.
    pub kind: FactTypeKind,
}

/// The closed set of fact type variants.
#[derive(Debug, Clone)]
pub enum FactTypeKind {
    /// An asserted fact type.
    Plain,
    /// A subtype/supertype relationship.
    TypeInheritance(TypeInheritance),
    /// An implicit fact type linking an objectifying entity to one role of
    /// the objectified fact type.
    Link {
        /// The role of the objectified fact type this link implies.
        implying_role: RoleId,
    },
}

/// A subtyping relationship between two entity types.
#[derive(Debug, Clone)]
pub struct TypeInheritance {
    /// The more specific entity type.
    pub subtype: ObjectTypeId,
    /// The more general entity type.
    pub supertype: ObjectTypeId,
    /// The subtype is identified through its supertype.
    pub provides_identification: bool,
    /// How this subtype relationship is mapped.
    pub assimilation: Option<Assimilation>,
}

/// A position in a fact type, played by one object type.
#[derive(Debug, Clone)]
pub struct Role {
    /// The owning fact type.
    pub fact_type: FactTypeId,
    /// Position within the fact type.
    pub ordinal: usize,
    /// The object type playing this role.
    pub player: ObjectTypeId,
    /// Explicit role name.
    pub role_name: Option<String>,
    /// Role sequences referencing this role.
    pub sequences: Vec<RoleSequenceId>,
    /// Set on a mirror role: the role of the objectified fact type it mirrors.
    pub base_role: Option<RoleId>,
    /// The mirror role created for this role by objectification.
    pub mirror_role: Option<RoleId>,
    /// Restriction on the values played in this role.
    pub value_constraint: Option<ValueConstraintId>,
}

/// One entry of a [`RoleSequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    /// The referenced role.
    pub role: RoleId,
    /// Adjective preceding the player name in readings.
    pub leading_adjective: Option<String>,
    /// Adjective following the player name in readings.
    pub trailing_adjective: Option<String>,
}

impl RoleRef {
    /// A reference with no adjectives.
    #[must_use]
    pub fn plain(role: RoleId) -> Self {
        Self {
            role,
            leading_adjective: None,
            trailing_adjective: None,
        }
    }
}

/// An ordered group of role references used by constraints and readings.
#[derive(Debug, Clone)]
pub struct RoleSequence {
    /// Role references in order.
    pub refs: Vec<RoleRef>,
    /// Presence constraints defined over this sequence.
    pub constraints: Vec<ConstraintId>,
}

impl RoleSequence {
    /// Iterates the referenced roles in order.
    pub fn roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.refs.iter().map(|r| r.role)
    }
}

/// A min/max occurrence rule over a role sequence.
#[derive(Debug, Clone)]
pub struct PresenceConstraint {
    /// Constraint name.
    pub name: Option<String>,
    /// The constrained role sequence.
    pub role_sequence: RoleSequenceId,
    /// Minimum occurrence frequency.
    pub min_frequency: Option<u32>,
    /// Maximum occurrence frequency.
    pub max_frequency: Option<u32>,
    /// Every instance of the player must play the role(s).
    pub is_mandatory: bool,
    /// This constraint is the preferred identifier of its entity type.
    pub is_preferred_identifier: bool,
    /// Deontic enforcement code; `None` for alethic constraints.
    pub enforcement: Option<String>,
}

impl PresenceConstraint {
    /// A constraint over `role_sequence` with no frequencies set.
    #[must_use]
    pub fn over(role_sequence: RoleSequenceId) -> Self {
        Self {
            name: None,
            role_sequence,
            min_frequency: None,
            max_frequency: None,
            is_mandatory: false,
            is_preferred_identifier: false,
            enforcement: None,
        }
    }

    /// Verbalises the frequency, e.g. `"at least one and at most 3"` or `"one"`.
    #[must_use]
    pub fn frequency(&self) -> String {
        let number = |n: u32| {
            if n == 1 {
                "one".to_owned()
            } else {
                n.to_string()
            }
        };
        let (min, max) = (self.min_frequency, self.max_frequency);
        let mut parts = Vec::new();
        if let Some(min) = min.filter(|&m| m > 0 && Some(m) != max) {
            parts.push(format!("at least {}", number(min)));
        }
        if let Some(max) = max.filter(|&m| Some(m) != min) {
            parts.push(format!("at most {}", number(max)));
        }
        if let Some(max) = max.filter(|&m| Some(m) == min) {
            parts.push(if max == 1 {
                "one".to_owned()
            } else {
                format!("exactly {max}")
            });
        }
        parts.join(" and ")
    }

    /// True for an alethic at-most-one constraint.
    #[must_use]
    pub fn is_uniqueness(&self) -> bool {
        self.max_frequency == Some(1) && self.enforcement.is_none()
    }
}

/// A value literal, optionally with a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    /// The literal text.
    pub literal: String,
    /// The literal was written as a quoted string.
    pub is_literal_string: bool,
    /// Unit of measure.
    pub unit: Option<String>,
}

impl Value {
    /// A numeric literal.
    #[must_use]
    pub fn number(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            is_literal_string: false,
            unit: None,
        }
    }

    /// A string literal.
    #[must_use]
    pub fn string(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            is_literal_string: true,
            unit: None,
        }
    }

    /// Interprets the literal as an integer, truncating any fraction.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        let text = self.literal.trim();
        text.parse::<i128>().ok().or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i128)
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_literal_string {
            write!(f, "'{}'", self.literal.replace('\'', "\\'"))?;
        } else {
            write!(f, "{}", self.literal)?;
        }
        if let Some(unit) = &self.unit {
            write!(f, " {unit}")?;
        }
        Ok(())
    }
}

/// One end of a [`ValueRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    /// The bounding value.
    pub value: Value,
    /// The bound itself is permitted.
    pub is_inclusive: bool,
}

impl Bound {
    /// An inclusive bound.
    #[must_use]
    pub fn inclusive(value: Value) -> Self {
        Self {
            value,
            is_inclusive: true,
        }
    }

    /// An exclusive bound.
    #[must_use]
    pub fn exclusive(value: Value) -> Self {
        Self {
            value,
            is_inclusive: false,
        }
    }
}

/// A range of permitted values; either end may be open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    /// Lower bound.
    pub minimum: Option<Bound>,
    /// Upper bound.
    pub maximum: Option<Bound>,
}

impl ValueRange {
    /// An inclusive integer range.
    #[must_use]
    pub fn integers(min: i128, max: i128) -> Self {
        Self {
            minimum: Some(Bound::inclusive(Value::number(min.to_string()))),
            maximum: Some(Bound::inclusive(Value::number(max.to_string()))),
        }
    }

    /// A range admitting exactly one value.
    #[must_use]
    pub fn single(value: Value) -> Self {
        Self {
            minimum: Some(Bound::inclusive(value.clone())),
            maximum: Some(Bound::inclusive(value)),
        }
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = self.minimum.as_ref().map(|b| b.value.to_string());
        let max = self.maximum.as_ref().map(|b| b.value.to_string());
        match (min, max) {
            (Some(min), Some(max)) if min == max => write!(f, "{min}"),
            (min, max) => write!(
                f,
                "{}..{}",
                min.unwrap_or_default(),
                max.unwrap_or_default()
            ),
        }
    }
}

/// A restriction on the values of a value type or role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueConstraint {
    /// Permitted ranges.
    pub ranges: Vec<ValueRange>,
    /// Permitted pattern.
    pub regular_expression: Option<String>,
}

impl ValueConstraint {
    /// A constraint permitting the given ranges.
    #[must_use]
    pub fn ranges(ranges: Vec<ValueRange>) -> Self {
        Self {
            ranges,
            regular_expression: None,
        }
    }

    /// Renders the constraint in the modeling language's `restricted to` form.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.regular_expression {
            Some(re) => format!("restricted to /{re}/"),
            None => format!(
                "restricted to {{{}}}",
                self.ranges
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// A natural-language template over a fact type's roles.
///
/// `text` contains `{n}` placeholders, where `n` indexes `role_sequence`.
#[derive(Debug, Clone)]
pub struct Reading {
    /// The fact type read.
    pub fact_type: FactTypeId,
    /// Preference order among the fact type's readings.
    pub ordinal: usize,
    /// The roles in placeholder order.
    pub role_sequence: RoleSequenceId,
    /// Template text, e.g. `"{0} works for {1}"`.
    pub text: String,
    /// The reading states the negation of the fact.
    pub is_negative: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(min: Option<u32>, max: Option<u32>) -> PresenceConstraint {
        PresenceConstraint {
            min_frequency: min,
            max_frequency: max,
            ..PresenceConstraint::over(RoleSequenceId::from_index(0))
        }
    }

    #[test]
    fn frequency_verbalisation() {
        assert_eq!(pc(Some(1), Some(1)).frequency(), "one");
        assert_eq!(pc(None, Some(1)).frequency(), "at most one");
        assert_eq!(pc(Some(1), None).frequency(), "at least one");
        assert_eq!(pc(Some(2), Some(2)).frequency(), "exactly 2");
        assert_eq!(pc(Some(2), Some(5)).frequency(), "at least 2 and at most 5");
    }

    #[test]
    fn value_literals_truncate_to_integers() {
        assert_eq!(Value::number("42").as_integer(), Some(42));
        assert_eq!(Value::number("-7.9").as_integer(), Some(-7));
        assert_eq!(Value::string("abc").as_integer(), None);
    }

    #[test]
    fn value_constraint_describes_its_ranges() {
        let vc = ValueConstraint::ranges(vec![
            ValueRange::integers(1, 10),
            ValueRange::single(Value::string("x")),
        ]);
        assert_eq!(vc.describe(), "restricted to {1..10, 'x'}");
    }

    #[test]
    fn assimilation_parses_its_own_text() {
        for a in [
            Assimilation::Absorbed,
            Assimilation::Separate,
            Assimilation::Partitioned,
        ] {
            assert_eq!(Assimilation::parse(a.as_str()), Some(a));
        }
        assert!(!Assimilation::Absorbed.is_separating());
    }
}
