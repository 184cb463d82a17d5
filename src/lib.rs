//! # graphwire
//!
//! Type-aware serialization of in-memory object graphs.
//!
//! graphwire turns graphs of values (including shared nodes, cycles and
//! custom objects) into JSON text and rebuilds them exactly: identity and
//! sharing are kept, and NaN, infinities, negative zero, 64-bit integers and
//! instants survive unchanged.
//!
//! ## Crates
//!
//! - `graphwire-core`: value model, type registry, encoder, wire format,
//!   parser, decoder and equality oracle (re-exported at the root)
//! - `graphwire-tables`: typed-column [`tables::Table`] with its registered
//!   descriptor (feature `tables`, on by default)
//!
//! ## Feature Flags
//!
//! - `tables` (default) - Tabular container type
//!
//! ## Quick Start
//!
//! ```rust
//! use graphwire::prelude::*;
//! use graphwire::tables::{Column, Table};
//!
//! graphwire::init().unwrap();
//!
//! let table = Table::from_columns(None, [Column::from_ints("n", [1, 2, 3])]).unwrap();
//! let root = Value::map([("a", Value::object(table)), ("ratio", Value::Float(f64::NAN))]);
//!
//! let text = serialize(&root).unwrap();
//! let decoded = deserialize(&text).unwrap();
//! assert!(deep_equal(&root, &decoded));
//! ```
//!
//! ## Custom Types
//!
//! Implement [`CustomObject`] for the type and register a [`TypeDescriptor`],
//! either into an explicit [`TypeRegistry`] or process-wide with
//! [`register_type!`].

pub use graphwire_core::*;

#[cfg(feature = "tables")]
pub use graphwire_tables as tables;

/// Commonly used items.
pub mod prelude {
	pub use graphwire_core::prelude::*;

	#[cfg(feature = "tables")]
	pub use graphwire_tables::{Column, ColumnKind, Table};
}
