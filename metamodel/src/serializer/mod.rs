//! Serializers for compositions.
//!
//! - **JSON** ([`json`]): a nested document of composites, columns and
//!   access paths, used for inspection and golden tests.

pub mod json;
