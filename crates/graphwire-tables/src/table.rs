//! Table container

use graphwire_core::CustomObject;
use std::any::Any;

use crate::column::Column;
use crate::error::{Result, TableError};

/// An optionally named, ordered set of equal-length columns.
///
/// # Example
///
/// ```rust
/// use graphwire_tables::{Column, Table};
///
/// let mut table = Table::named("prices");
/// table.add_column(Column::from_strings("sku", ["a", "b"])).unwrap();
/// table.add_column(Column::from_doubles("price", [1.0, 2.2])).unwrap();
///
/// assert_eq!(table.row_count(), 2);
/// assert_eq!(table.column_names(), vec!["sku", "price"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
	name: Option<String>,
	columns: Vec<Column>,
}

impl Table {
	/// Create an unnamed table with no columns.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			columns: Vec::new(),
		}
	}

	/// Build a table, validating names and lengths in column order.
	pub fn from_columns(name: Option<String>, columns: impl IntoIterator<Item = Column>) -> Result<Self> {
		let mut table = Self {
			name,
			columns: Vec::new(),
		};
		for column in columns {
			table.add_column(column)?;
		}
		Ok(table)
	}

	/// Append a column.
	///
	/// # Errors
	///
	/// Returns `TableError::DuplicateColumn` if the name is taken, or
	/// `TableError::LengthMismatch` if the table already has columns of a
	/// different length.
	pub fn add_column(&mut self, column: Column) -> Result<()> {
		if self.column(column.name()).is_some() {
			return Err(TableError::DuplicateColumn(column.name().to_string()));
		}
		if let Some(first) = self.columns.first() {
			if first.len() != column.len() {
				return Err(TableError::LengthMismatch {
					column: column.name().to_string(),
					expected: first.len(),
					found: column.len(),
				});
			}
		}
		self.columns.push(column);
		Ok(())
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn set_name(&mut self, name: Option<String>) {
		self.name = name;
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.name() == name)
	}

	pub fn columns(&self) -> &[Column] {
		&self.columns
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.iter().map(Column::name).collect()
	}

	/// Number of rows; zero for a table without columns.
	pub fn row_count(&self) -> usize {
		self.columns.first().map_or(0, Column::len)
	}

	pub fn column_count(&self) -> usize {
		self.columns.len()
	}

	/// Same name and columns in the same order, with NaN equal to NaN.
	pub fn content_eq(&self, other: &Table) -> bool {
		self.name == other.name
			&& self.columns.len() == other.columns.len()
			&& self
				.columns
				.iter()
				.zip(&other.columns)
				.all(|(a, b)| a.content_eq(b))
	}
}

impl CustomObject for Table {
	fn type_name(&self) -> &str {
		"Table"
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}
