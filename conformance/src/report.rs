//! Validation report types: subjects, problems, severity levels and report aggregation.

use std::collections::BTreeMap;

use orm_metamodel::{AccessPathId, ComponentId, CompositeId, Composition, Schema};
use serde_json::{json, Value};

/// Severity level of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A construct the validator does not check.
    Warning,
    /// A structural violation.
    Failure,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Failure => "failure",
        }
    }
}

/// The element a problem is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subject {
    /// A composite as a whole.
    Composite(CompositeId),
    /// A component of a mapping tree.
    Component(ComponentId),
    /// An index or foreign key.
    AccessPath(AccessPathId),
}

impl Subject {
    /// Describes the subject in terms of the schema.
    #[must_use]
    pub fn describe(self, schema: &Schema, composition: &Composition) -> String {
        match self {
            Subject::Composite(id) => format!("Composite {}", composition.composite_name(id)),
            Subject::Component(id) => composition.inspect(schema, id),
            Subject::AccessPath(id) => composition.inspect_access_path(schema, id),
        }
    }
}

impl From<CompositeId> for Subject {
    fn from(id: CompositeId) -> Self {
        Subject::Composite(id)
    }
}

impl From<ComponentId> for Subject {
    fn from(id: ComponentId) -> Self {
        Subject::Component(id)
    }
}

impl From<AccessPathId> for Subject {
    fn from(id: AccessPathId) -> Self {
        Subject::AccessPath(id)
    }
}

/// A single problem found in a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// What the problem concerns.
    pub subject: Subject,
    /// Human-readable description.
    pub message: String,
    /// Severity of the problem.
    pub severity: Severity,
}

impl Problem {
    /// Creates a failure.
    pub fn fail(subject: impl Into<Subject>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            severity: Severity::Failure,
        }
    }

    /// Creates a warning.
    pub fn warn(subject: impl Into<Subject>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    /// Returns true if this problem is a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.severity == Severity::Failure
    }
}

/// Every problem found in a composition, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// All problems across all composites.
    pub problems: Vec<Problem>,
}

impl ValidationReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a problem to this report.
    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    /// Extends this report with the problems of another.
    pub fn extend(&mut self, other: ValidationReport) {
        self.problems.extend(other.problems);
    }

    /// Number of problems, warnings included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Returns true if no problem was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Returns true if no problem was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_empty()
    }

    /// Returns the count of failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.problems.iter().filter(|p| p.is_failure()).count()
    }

    /// The problem messages grouped by subject.
    #[must_use]
    pub fn by_subject(&self) -> BTreeMap<Subject, Vec<&str>> {
        let mut grouped: BTreeMap<Subject, Vec<&str>> = BTreeMap::new();
        for problem in &self.problems {
            grouped.entry(problem.subject).or_default().push(&problem.message);
        }
        grouped
    }

    /// The problems concerning one subject.
    pub fn about(&self, subject: impl Into<Subject>) -> impl Iterator<Item = &Problem> {
        let subject = subject.into();
        self.problems.iter().filter(move |p| p.subject == subject)
    }

    /// The report as JSON, with each subject described against the schema.
    #[must_use]
    pub fn to_json(&self, schema: &Schema, composition: &Composition) -> Value {
        Value::Array(
            self.problems
                .iter()
                .map(|p| {
                    json!({
                        "subject": p.subject.describe(schema, composition),
                        "severity": p.severity.label(),
                        "message": p.message,
                    })
                })
                .collect(),
        )
    }
}
