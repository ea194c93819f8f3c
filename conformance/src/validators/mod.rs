//! Structural validators for compositions.
//!
//! Each validator walks part of a composition and hands every problem it
//! finds to the caller's collector. None of them stop at the first problem.

pub mod access_paths;
pub mod composite;
pub mod members;

use orm_metamodel::{Composition, Schema};

use crate::report::Problem;

/// What every validator needs: the schema, the composition and somewhere
/// to put problems.
pub struct Context<'a, 'c> {
    /// The schema the composition maps.
    pub schema: &'a Schema,
    /// The composition under validation.
    pub composition: &'a Composition,
    collector: &'c mut dyn FnMut(Problem),
}

impl<'a, 'c> Context<'a, 'c> {
    /// Wraps a collector.
    pub fn new(schema: &'a Schema, composition: &'a Composition, collector: &'c mut dyn FnMut(Problem)) -> Self {
        Self {
            schema,
            composition,
            collector,
        }
    }

    /// Reports a problem.
    pub fn report(&mut self, problem: Problem) {
        (self.collector)(problem);
    }
}
