//! Semantic data types and host integer selection.
//!
//! [`SemanticType::normalize`] resolves declared type names and their aliases
//! to one of the canonical semantic types. [`normalize_integer_length`] picks a
//! host integer type for a declared length and value constraint, using a
//! pluggable [`DataTypeContext`].

use std::fmt;

use crate::model::ValueConstraint;

/// The canonical semantic data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SemanticType {
    /// True or false.
    Boolean,
    /// Whole numbers; length is the number of bits.
    Integer,
    /// Floating point; length is the number of mantissa bits.
    Real,
    /// Exact decimal with precision and scale.
    Decimal,
    /// Currency amount with precision and scale.
    Money,
    /// Fixed-length text.
    Char,
    /// Variable-length text.
    String,
    /// Large text.
    Text,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time of day.
    DateTime,
    /// A point in time.
    Timestamp,
    /// Raw bytes.
    Binary,
}

/// A parameter a semantic type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypeParameter {
    /// Bits for numbers, characters for text, bytes for binary.
    Length,
    /// Significant digits.
    Precision,
    /// Fractional digits.
    Scale,
    /// Character set, e.g. `latin1`.
    Charset,
}

impl SemanticType {
    /// All semantic types in canonical order.
    pub const ALL: [SemanticType; 13] = [
        SemanticType::Boolean,
        SemanticType::Integer,
        SemanticType::Real,
        SemanticType::Decimal,
        SemanticType::Money,
        SemanticType::Char,
        SemanticType::String,
        SemanticType::Text,
        SemanticType::Date,
        SemanticType::Time,
        SemanticType::DateTime,
        SemanticType::Timestamp,
        SemanticType::Binary,
    ];

    /// The canonical name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SemanticType::Boolean => "Boolean",
            SemanticType::Integer => "Integer",
            SemanticType::Real => "Real",
            SemanticType::Decimal => "Decimal",
            SemanticType::Money => "Money",
            SemanticType::Char => "Char",
            SemanticType::String => "String",
            SemanticType::Text => "Text",
            SemanticType::Date => "Date",
            SemanticType::Time => "Time",
            SemanticType::DateTime => "DateTime",
            SemanticType::Timestamp => "Timestamp",
            SemanticType::Binary => "Binary",
        }
    }

    /// Alternate names. An `_` matches an underscore, a space, or nothing.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            SemanticType::Boolean => &["bit"],
            SemanticType::Integer => &[
                "auto_counter",
                "int",
                "tiny_int",
                "small_int",
                "big_int",
                "unsigned",
                "unsigned_int",
                "unsigned_integer",
                "signed_int",
                "signed_integer",
            ],
            SemanticType::Real => &["float", "double"],
            SemanticType::Money => &["currency"],
            SemanticType::Char => &[
                "character",
                "nchar",
                "national_character",
                "fixed_length_text",
            ],
            SemanticType::String => &[
                "varchar",
                "nvarchar",
                "national_character_varying",
                "variable_length_text",
            ],
            SemanticType::Text => &["large_length_text"],
            SemanticType::DateTime => &["date_time"],
            SemanticType::Timestamp => &["time_stamp", "auto_time_stamp"],
            SemanticType::Binary => &["guid", "picture_raw_data", "variable_length_raw_data"],
            SemanticType::Decimal | SemanticType::Date | SemanticType::Time => &[],
        }
    }

    /// The parameters this type accepts.
    #[must_use]
    pub fn parameters(self) -> &'static [TypeParameter] {
        use TypeParameter::{Charset, Length, Precision, Scale};
        match self {
            SemanticType::Integer | SemanticType::Real => &[Length],
            SemanticType::Decimal | SemanticType::Money => &[Precision, Scale],
            SemanticType::Char | SemanticType::String | SemanticType::Binary => &[Length, Charset],
            SemanticType::Text => &[Charset],
            SemanticType::Boolean
            | SemanticType::Date
            | SemanticType::Time
            | SemanticType::DateTime
            | SemanticType::Timestamp => &[],
        }
    }

    /// Resolves a declared type name to a semantic type.
    ///
    /// Matching is case-insensitive against the canonical name and every
    /// alias; the first type with a match wins.
    #[must_use]
    pub fn normalize(type_name: &str) -> Option<SemanticType> {
        Self::ALL.into_iter().find(|t| {
            t.name().eq_ignore_ascii_case(type_name)
                || t.aliases().iter().any(|alias| alias_matches(alias, type_name))
        })
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn alias_matches(alias: &str, candidate: &str) -> bool {
    fn go(alias: &[u8], candidate: &[u8]) -> bool {
        match alias.split_first() {
            None => candidate.is_empty(),
            Some((b'_', rest)) => {
                go(rest, candidate)
                    || matches!(candidate.first(), Some(b'_' | b' ')) && go(rest, &candidate[1..])
            }
            Some((a, rest)) => candidate
                .first()
                .is_some_and(|c| c.eq_ignore_ascii_case(a))
                && go(rest, &candidate[1..]),
        }
    }
    go(alias.as_bytes(), candidate.as_bytes())
}

/// A host integer type and the values it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IntegerRange {
    /// Host type name, e.g. `SMALLINT`.
    pub name: String,
    /// Smallest value.
    pub min: i128,
    /// Largest value.
    pub max: i128,
    /// Storage size in bits.
    pub bits: u32,
}

impl IntegerRange {
    /// Creates a range.
    #[must_use]
    pub fn new(name: impl Into<String>, min: i128, max: i128, bits: u32) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            bits,
        }
    }

    /// True if every value in `[min, max]` fits.
    #[must_use]
    pub fn contains(&self, min: i128, max: i128) -> bool {
        min >= self.min && max <= self.max
    }

    fn span(&self) -> u128 {
        self.max.abs_diff(self.min)
    }
}

/// The host integer type chosen for a column.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IntegerType {
    /// Host type name.
    pub name: String,
    /// Bit length.
    pub bits: u32,
}

/// Host database conventions consulted by the type normalizer.
///
/// Implementors usually override [`integer_ranges`](Self::integer_ranges)
/// only. A context may prepend or replace ranges; the selection algorithm
/// honours whatever list it returns.
pub trait DataTypeContext {
    /// Available integer types, in preference order for ties.
    fn integer_ranges(&self) -> Vec<IntegerRange>;

    /// The default length for a type when none is declared.
    ///
    /// Integers default from the name: `Tiny` 8, `Small`/`Short` 16, `Big` 64,
    /// otherwise 32. Reals default to 53 (a double's mantissa).
    fn default_length(&self, kind: SemanticType, type_name: &str) -> Option<u32> {
        match kind {
            SemanticType::Real => Some(53),
            SemanticType::Integer => {
                let lower = type_name.to_ascii_lowercase();
                Some(if lower.contains("tiny") {
                    8
                } else if lower.contains("small") || lower.contains("short") {
                    16
                } else if lower.contains("big") {
                    64
                } else {
                    32
                })
            }
            _ => None,
        }
    }

    /// Host type for booleans.
    fn boolean_type(&self) -> &str {
        "BOOLEAN"
    }

    /// Host type for surrogate keys.
    fn surrogate_type(&self) -> &str {
        "BIGINT"
    }

    /// Host type for a semantic type, before any length is applied.
    fn host_type(&self, semantic: SemanticType) -> &str {
        match semantic {
            SemanticType::Boolean => self.boolean_type(),
            SemanticType::Integer => "INTEGER",
            SemanticType::Real => "FLOAT",
            SemanticType::Decimal | SemanticType::Money => "DECIMAL",
            SemanticType::Char => "CHAR",
            SemanticType::String => "VARCHAR",
            SemanticType::Text => "TEXT",
            SemanticType::Date => "DATE",
            SemanticType::Time => "TIME",
            SemanticType::DateTime | SemanticType::Timestamp => "TIMESTAMP",
            SemanticType::Binary => "VARBINARY",
        }
    }

    /// The narrowest range containing `[min, max]`; ties go to the earlier range.
    fn choose_integer_type(&self, min: i128, max: i128) -> Option<IntegerRange> {
        let mut best: Option<IntegerRange> = None;
        for range in self.integer_ranges() {
            if range.contains(min, max) && best.as_ref().is_none_or(|b| range.span() < b.span()) {
                best = Some(range);
            }
        }
        best
    }
}

/// Standard SQL integer types: `SMALLINT`, `INTEGER`, `BIGINT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlContext;

impl DataTypeContext for SqlContext {
    fn integer_ranges(&self) -> Vec<IntegerRange> {
        vec![
            IntegerRange::new("SMALLINT", -(1 << 15), (1 << 15) - 1, 16),
            IntegerRange::new("INTEGER", -(1 << 31), (1 << 31) - 1, 32),
            IntegerRange::new("BIGINT", -(1 << 63), (1 << 63) - 1, 64),
        ]
    }
}

/// `2^(bits-1) - 1`, saturating at `i128::MAX`.
fn half_range(bits: u32) -> i128 {
    match bits {
        0 => 0,
        1..=127 => (1i128 << (bits - 1)) - 1,
        _ => i128::MAX,
    }
}

/// Smallest minimum and largest maximum over a constraint's ranges.
///
/// Exclusive bounds are widened by one. Open ends and non-numeric bounds
/// contribute nothing.
#[must_use]
pub fn value_constraint_bounds(constraint: &ValueConstraint) -> (Option<i128>, Option<i128>) {
    let min = constraint
        .ranges
        .iter()
        .filter_map(|r| r.minimum.as_ref())
        .filter_map(|b| {
            let v = b.value.as_integer()?;
            Some(if b.is_inclusive { v } else { v.saturating_sub(1) })
        })
        .min();
    let max = constraint
        .ranges
        .iter()
        .filter_map(|r| r.maximum.as_ref())
        .filter_map(|b| {
            let v = b.value.as_integer()?;
            Some(if b.is_inclusive { v } else { v.saturating_add(1) })
        })
        .max();
    (min, max)
}

/// Chooses a host integer type for a declared integer type.
///
/// The working length is `length`, else the context's default for
/// `type_name`. Bounds come from `value_constraint` where given. The
/// length's own range (`[0, 2^(n-1)-1]` for names starting `unsigned`,
/// otherwise `[-(2^(n-1)-1), 2^(n-1)-1]`) fills a missing bound, and with
/// an explicit length replaces a bound it is tighter than. The context
/// then picks the narrowest containing range. Without an explicit length,
/// an unmatched request falls back to the context's last range; with one,
/// to `type_name` at that length.
#[must_use]
pub fn normalize_integer_length(
    type_name: &str,
    length: Option<u32>,
    value_constraint: Option<&ValueConstraint>,
    context: &dyn DataTypeContext,
) -> Option<IntegerType> {
    let int_length = length.or_else(|| context.default_length(SemanticType::Integer, type_name))?;
    let (mut min, mut max) = value_constraint.map(value_constraint_bounds).unwrap_or_default();

    let unsigned = type_name
        .get(..8)
        .is_some_and(|p| p.eq_ignore_ascii_case("unsigned"));
    let int_max = half_range(int_length);
    let int_min = if unsigned { 0 } else { -int_max };
    let explicit = length.is_some();
    if min.is_none_or(|m| explicit && int_min > m) {
        min = Some(int_min);
    }
    if max.is_none_or(|m| explicit && int_max < m) {
        max = Some(int_max);
    }
    let (min, max) = (min.unwrap_or(int_min), max.unwrap_or(int_max));

    let chosen = context.choose_integer_type(min, max).or_else(|| {
        if explicit {
            None
        } else {
            context.integer_ranges().pop()
        }
    });
    match (chosen, length) {
        (Some(range), _) => Some(IntegerType {
            name: range.name,
            bits: range.bits,
        }),
        (None, Some(bits)) => Some(IntegerType {
            name: type_name.to_owned(),
            bits,
        }),
        (None, None) => None,
    }
}
