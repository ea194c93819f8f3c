//! Maps a fact-based conceptual [`Schema`](orm_metamodel::Schema) onto
//! relational composites.
//!
//! [`Compositor::compose`] decides, for every binary fact type, which player
//! absorbs the other ([`is_preferred_direction`]), chooses the object types
//! that become composites, fills each composite with columns, indices and
//! foreign keys, and ranks the columns into their final order
//! ([`rank_key`], [`re_rank`]). [`column_type`] resolves the data type of a
//! leaf column against a [`DataTypeContext`](orm_metamodel::DataTypeContext).
//!
//! ```
//! use orm_composer::{Compositor, CompositorOptions};
//! use orm_metamodel::Schema;
//!
//! let mut schema = Schema::new();
//! let person = schema.add_entity_type("Person");
//! let name = schema.add_value_type("PersonName");
//! let ft = schema.add_fact_type(&[person, name])?;
//! let roles = schema.fact_type(ft).roles.clone();
//! schema.add_uniqueness_constraint(&roles[..1], false)?;
//! schema.add_uniqueness_constraint(&roles[1..], true)?;
//!
//! let composition = Compositor::compose(&mut schema, CompositorOptions::default())?;
//! assert_eq!(composition.composites().count(), 1);
//! # Ok::<(), orm_composer::ComposeError>(())
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod absorption;
pub mod columns;
pub mod compositor;
pub mod error;
pub mod rank;

pub use absorption::{flip, is_forward, is_preferred_direction};
pub use columns::{column_type, ColumnType};
pub use compositor::{Compositor, CompositorOptions};
pub use error::ComposeError;
pub use rank::{leaves, rank_key, re_rank, re_rank_all};
