//! Structural validation of relational compositions.
//!
//! A composition built by hand, or by a compositor with bugs, can violate
//! invariants that construction does not enforce. [`validate`] walks every
//! composite once and reports all the problems it finds rather than
//! stopping at the first.
//!
//! # Checks
//!
//! | Subject | Checks |
//! |---------|--------|
//! | Root mapping | object type, name, no parent, no ordinal, rooted in its composite |
//! | Members | unique sibling names, names present, no bare child mappings |
//! | Absorptions | roles of one fact type, players match, mirror roles swapped, nesting mode |
//! | Indicators, discriminators | roles played by the enclosing object type |
//! | Access paths | fields present, columns only, rooted in the owning composite |
//! | Foreign keys | fields pair 1:1 with index fields by kind and target type |
//!
//! # Entry Point
//!
//! ```
//! use orm_conformance::validate;
//! use orm_metamodel::{Composition, Schema};
//!
//! let schema = Schema::new();
//! let composition = Composition::new("empty");
//! assert!(validate(&schema, &composition).is_clean());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod report;
pub mod validators;

use orm_metamodel::{Composition, Schema};
use tracing::warn;

pub use report::{Problem, Severity, Subject, ValidationReport};

/// Validates every composite and returns the problems found. Each problem is
/// also logged at `warn` level.
#[must_use]
pub fn validate(schema: &Schema, composition: &Composition) -> ValidationReport {
    let mut report = ValidationReport::new();
    validate_with(schema, composition, |problem| {
        warn!(
            target: "orm::validate",
            subject = %problem.subject.describe(schema, composition),
            severity = ?problem.severity,
            "{}",
            problem.message
        );
        report.push(problem);
    });
    report
}

/// Validates every composite, handing each problem to `collector`.
pub fn validate_with(schema: &Schema, composition: &Composition, mut collector: impl FnMut(Problem)) {
    let mut cx = validators::Context::new(schema, composition, &mut collector);
    for (composite, _) in composition.composites() {
        validators::composite::validate(&mut cx, composite);
    }
}
