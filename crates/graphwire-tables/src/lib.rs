//! Typed-column tables for graphwire
//!
//! A [`Table`] is a named set of equal-length columns, each holding values of
//! one [`ColumnKind`]. The crate registers a `"Table"` type descriptor at
//! compile time, so tables nested anywhere in a value graph round-trip through
//! `graphwire_core::serialize` and `graphwire_core::deserialize` once
//! `graphwire_core::init()` has run.
//!
//! # Example
//!
//! ```rust
//! use graphwire_core::{GraphSerializer, TypeRegistry, Value};
//! use graphwire_tables::{Column, Table};
//!
//! let mut registry = TypeRegistry::new();
//! graphwire_tables::register(&mut registry).unwrap();
//! let serializer = GraphSerializer::new(registry);
//!
//! let table = Table::from_columns(
//!     None,
//!     [
//!         Column::from_strings("a", ["a", "b"]),
//!         Column::from_doubles("b", [1.0, 2.2]),
//!     ],
//! )
//! .unwrap();
//! let root = Value::map([("a", Value::object(table))]);
//!
//! let text = serializer.serialize(&root).unwrap();
//! let decoded = serializer.deserialize(&text).unwrap();
//! assert!(serializer.deep_equal(&root, &decoded));
//! ```

#![warn(rustdoc::broken_intra_doc_links)]

pub mod column;
pub mod descriptor;
pub mod error;
pub mod table;

// Re-exports for convenience
pub use column::{Column, ColumnData, ColumnKind};
pub use descriptor::{TABLE_TAG, TABLE_VERSION, descriptor, register};
pub use error::{Result, TableError};
pub use table::Table;
