//! Typed columns
//!
//! A [`Column`] is a name plus a homogeneous vector of values. The element
//! type is fixed by the [`ColumnData`] variant and reported as a
//! [`ColumnKind`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TableError;

/// Element type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
	String,
	Double,
	Int,
	Bool,
	DateTime,
}

impl ColumnKind {
	/// Name used in serialized payloads.
	pub fn as_str(&self) -> &'static str {
		match self {
			ColumnKind::String => "string",
			ColumnKind::Double => "double",
			ColumnKind::Int => "int",
			ColumnKind::Bool => "bool",
			ColumnKind::DateTime => "datetime",
		}
	}
}

impl fmt::Display for ColumnKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ColumnKind {
	type Err = TableError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"string" => Ok(ColumnKind::String),
			"double" => Ok(ColumnKind::Double),
			"int" => Ok(ColumnKind::Int),
			"bool" => Ok(ColumnKind::Bool),
			"datetime" => Ok(ColumnKind::DateTime),
			other => Err(TableError::UnknownKind(other.to_string())),
		}
	}
}

/// Column values, one vector per element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
	String(Vec<String>),
	Double(Vec<f64>),
	Int(Vec<i64>),
	Bool(Vec<bool>),
	DateTime(Vec<DateTime<Utc>>),
}

impl ColumnData {
	/// Empty data of the given kind.
	pub fn empty(kind: ColumnKind) -> Self {
		match kind {
			ColumnKind::String => ColumnData::String(Vec::new()),
			ColumnKind::Double => ColumnData::Double(Vec::new()),
			ColumnKind::Int => ColumnData::Int(Vec::new()),
			ColumnKind::Bool => ColumnData::Bool(Vec::new()),
			ColumnKind::DateTime => ColumnData::DateTime(Vec::new()),
		}
	}

	pub fn kind(&self) -> ColumnKind {
		match self {
			ColumnData::String(_) => ColumnKind::String,
			ColumnData::Double(_) => ColumnKind::Double,
			ColumnData::Int(_) => ColumnKind::Int,
			ColumnData::Bool(_) => ColumnKind::Bool,
			ColumnData::DateTime(_) => ColumnKind::DateTime,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			ColumnData::String(v) => v.len(),
			ColumnData::Double(v) => v.len(),
			ColumnData::Int(v) => v.len(),
			ColumnData::Bool(v) => v.len(),
			ColumnData::DateTime(v) => v.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Equality where NaN matches NaN in double columns.
	pub fn content_eq(&self, other: &ColumnData) -> bool {
		match (self, other) {
			(ColumnData::Double(a), ColumnData::Double(b)) => {
				a.len() == b.len()
					&& a
						.iter()
						.zip(b)
						.all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
			}
			_ => self == other,
		}
	}
}

/// A named column of values.
///
/// # Example
///
/// ```rust
/// use graphwire_tables::{Column, ColumnKind};
///
/// let column = Column::from_doubles("price", [1.0, 2.5]);
/// assert_eq!(column.kind(), ColumnKind::Double);
/// assert_eq!(column.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
	name: String,
	data: ColumnData,
}

impl Column {
	pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
		Self {
			name: name.into(),
			data,
		}
	}

	pub fn from_strings<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
		Self::new(name, ColumnData::String(values.into_iter().map(Into::into).collect()))
	}

	pub fn from_doubles(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
		Self::new(name, ColumnData::Double(values.into_iter().collect()))
	}

	pub fn from_ints(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
		Self::new(name, ColumnData::Int(values.into_iter().collect()))
	}

	pub fn from_bools(name: impl Into<String>, values: impl IntoIterator<Item = bool>) -> Self {
		Self::new(name, ColumnData::Bool(values.into_iter().collect()))
	}

	pub fn from_datetimes(
		name: impl Into<String>,
		values: impl IntoIterator<Item = DateTime<Utc>>,
	) -> Self {
		Self::new(name, ColumnData::DateTime(values.into_iter().collect()))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn data(&self) -> &ColumnData {
		&self.data
	}

	pub fn kind(&self) -> ColumnKind {
		self.data.kind()
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Same name, kind and values, with NaN equal to NaN.
	pub fn content_eq(&self, other: &Column) -> bool {
		self.name == other.name && self.data.content_eq(&other.data)
	}
}
