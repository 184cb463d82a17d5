//! Graph encoding for [`Table`]
//!
//! Payload layout (version 1):
//!
//! ```text
//! map {
//!     name: str | null,
//!     columns: seq [ map { name: str, kind: str, values: seq [...] } ],
//! }
//! ```

use graphwire_core::{HandlerError, RegistryError, Resolver, TypeDescriptor, TypeRegistry, Value};

use crate::column::{Column, ColumnData, ColumnKind};
use crate::table::Table;

/// Type tag written on the wire.
pub const TABLE_TAG: &str = "Table";

/// Current payload version.
pub const TABLE_VERSION: u32 = 1;

/// Descriptor for [`Table`].
pub fn descriptor() -> Result<TypeDescriptor, RegistryError> {
	TypeDescriptor::for_type::<Table>(TABLE_TAG, TABLE_VERSION)
		.encode_as(|table: &Table| Ok(encode_table(table)))
		.decode_as(decode_table)
		.equals_as(|a: &Table, b: &Table| a.content_eq(b))
		.build()
}

/// Add the table descriptor to an explicit registry.
pub fn register(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
	registry.register(descriptor()?)
}

graphwire_core::register_type!(descriptor);

fn encode_table(table: &Table) -> Value {
	let columns = table.columns().iter().map(|column| {
		Value::map([
			("name", Value::from(column.name())),
			("kind", Value::from(column.kind().as_str())),
			("values", encode_values(column.data())),
		])
	});

	Value::map([
		("name", Value::from(table.name())),
		("columns", Value::list(columns)),
	])
}

fn encode_values(data: &ColumnData) -> Value {
	match data {
		ColumnData::String(values) => Value::list(values.iter().map(|v| Value::from(v.as_str()))),
		ColumnData::Double(values) => Value::list(values.iter().map(|v| Value::Float(*v))),
		ColumnData::Int(values) => Value::list(values.iter().map(|v| Value::Int(*v))),
		ColumnData::Bool(values) => Value::list(values.iter().map(|v| Value::Bool(*v))),
		ColumnData::DateTime(values) => Value::list(values.iter().map(|v| Value::DateTime(*v))),
	}
}

fn decode_table(payload: Value, resolver: &Resolver<'_>) -> Result<Table, HandlerError> {
	let map = payload.expect_map()?;
	let name = match map.require("name")? {
		Value::Null | Value::Undefined => None,
		Value::String(name) => Some(name),
		other => return Err(HandlerError::mismatch("string or null", &other)),
	};

	let mut columns = Vec::new();
	for entry in map.require("columns")?.expect_list()?.snapshot() {
		columns.push(decode_column(&entry)?);
	}

	tracing::trace!(
		version = resolver.version(),
		columns = columns.len(),
		"decoded table payload"
	);
	Table::from_columns(name, columns).map_err(|e| HandlerError::Invalid(e.to_string()))
}

fn decode_column(entry: &Value) -> Result<Column, HandlerError> {
	let map = entry.expect_map()?;
	let name = map.require("name")?.expect_str()?.to_string();
	let kind = map
		.require("kind")?
		.expect_str()?
		.parse::<ColumnKind>()
		.map_err(|e| HandlerError::Invalid(e.to_string()))?;
	let values = map.require("values")?.expect_list()?.snapshot();

	let data = match kind {
		ColumnKind::String => ColumnData::String(collect(&values, "string", |v| {
			v.as_str().map(str::to_string)
		})?),
		ColumnKind::Double => ColumnData::Double(collect(&values, "number", Value::as_f64)?),
		ColumnKind::Int => ColumnData::Int(collect(&values, "int", Value::as_i64)?),
		ColumnKind::Bool => ColumnData::Bool(collect(&values, "bool", Value::as_bool)?),
		ColumnKind::DateTime => {
			ColumnData::DateTime(collect(&values, "datetime", |v| v.as_datetime().copied())?)
		}
	};
	Ok(Column::new(name, data))
}

fn collect<T>(
	values: &[Value],
	expected: &str,
	convert: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>, HandlerError> {
	values
		.iter()
		.map(|v| convert(v).ok_or_else(|| HandlerError::mismatch(expected, v)))
		.collect()
}
