//! Type name normalisation and integer width selection.

#![allow(clippy::unwrap_used)]

use orm_metamodel::datatypes::{normalize_integer_length, value_constraint_bounds};
use orm_metamodel::{
    Bound, DataTypeContext, IntegerRange, SemanticType, SqlContext, Value, ValueConstraint,
    ValueRange,
};

#[test]
fn aliases_resolve_to_semantic_types() {
    let cases = [
        ("VarChar", SemanticType::String),
        ("National Character Varying", SemanticType::String),
        ("nationalcharacter", SemanticType::Char),
        ("AutoCounter", SemanticType::Integer),
        ("auto_counter", SemanticType::Integer),
        ("UnsignedInteger", SemanticType::Integer),
        ("Double", SemanticType::Real),
        ("Currency", SemanticType::Money),
        ("Date Time", SemanticType::DateTime),
        ("AutoTimeStamp", SemanticType::Timestamp),
        ("GUID", SemanticType::Binary),
        ("bit", SemanticType::Boolean),
    ];
    for (name, expected) in cases {
        assert_eq!(SemanticType::normalize(name), Some(expected), "{name}");
    }
    assert_eq!(SemanticType::normalize("Colour"), None);
}

#[test]
fn value_constraints_narrow_the_default_width() {
    let age = ValueConstraint::ranges(vec![ValueRange::integers(0, 150)]);
    let chosen = normalize_integer_length("Integer", None, Some(&age), &SqlContext).unwrap();
    assert_eq!((chosen.name.as_str(), chosen.bits), ("SMALLINT", 16));

    let wide = ValueConstraint::ranges(vec![ValueRange::integers(0, 1 << 40)]);
    let chosen = normalize_integer_length("Integer", None, Some(&wide), &SqlContext).unwrap();
    assert_eq!(chosen.name, "BIGINT");
}

#[test]
fn declared_lengths_pick_the_matching_host_type() {
    for (name, length, expected) in [
        ("Integer", Some(32), "INTEGER"),
        ("BigInt", None, "BIGINT"),
        ("SmallInt", None, "SMALLINT"),
        ("UnsignedInteger", Some(16), "SMALLINT"),
    ] {
        let chosen = normalize_integer_length(name, length, None, &SqlContext).unwrap();
        assert_eq!(chosen.name, expected, "{name} {length:?}");
    }
}

#[test]
fn unmatched_widths_fall_back() {
    let chosen = normalize_integer_length("HugeInteger", Some(128), None, &SqlContext).unwrap();
    assert_eq!((chosen.name.as_str(), chosen.bits), ("HugeInteger", 128));

    let huge = ValueConstraint::ranges(vec![ValueRange::integers(0, i128::MAX)]);
    let chosen = normalize_integer_length("Integer", None, Some(&huge), &SqlContext).unwrap();
    assert_eq!(chosen.name, "BIGINT");
}

#[test]
fn exclusive_bounds_widen_by_one() {
    let vc = ValueConstraint::ranges(vec![ValueRange {
        minimum: Some(Bound::exclusive(Value::number("0"))),
        maximum: Some(Bound::exclusive(Value::number("10"))),
    }]);
    assert_eq!(value_constraint_bounds(&vc), (Some(-1), Some(11)));
}

struct ByteFirst;

impl DataTypeContext for ByteFirst {
    fn integer_ranges(&self) -> Vec<IntegerRange> {
        let mut ranges = SqlContext.integer_ranges();
        ranges.insert(0, IntegerRange::new("BYTE", 0, 255, 8));
        ranges
    }
}

#[test]
fn contexts_may_offer_narrower_ranges() {
    let percent = ValueConstraint::ranges(vec![ValueRange::integers(0, 100)]);
    let chosen = normalize_integer_length("Integer", None, Some(&percent), &ByteFirst).unwrap();
    assert_eq!((chosen.name.as_str(), chosen.bits), ("BYTE", 8));
    assert_eq!(ByteFirst.surrogate_type(), "BIGINT");
    assert_eq!(ByteFirst.host_type(SemanticType::String), "VARCHAR");
}
