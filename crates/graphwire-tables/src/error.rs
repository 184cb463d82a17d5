//! Error types for table construction

use thiserror::Error;

/// Result type for table operations
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors raised while building a table
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TableError {
	/// A column with this name already exists
	#[error("duplicate column name: {0}")]
	DuplicateColumn(String),

	/// Column length differs from the table's row count
	#[error("column '{column}' has {found} values, expected {expected}")]
	LengthMismatch {
		/// Column name
		column: String,
		/// Current row count of the table
		expected: usize,
		/// Length of the rejected column
		found: usize,
	},

	/// Column kind name not recognized
	#[error("unknown column kind: {0}")]
	UnknownKind(String),
}
