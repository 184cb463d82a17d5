//! Intermediate representation and its JSON wire form
//!
//! Every node is a JSON object whose `"k"` member names its kind:
//!
//! | kind      | members                       | meaning                              |
//! |-----------|-------------------------------|--------------------------------------|
//! | `undef`   |                               | absent value                         |
//! | `null`    |                               | null                                 |
//! | `bool`    | `v`                           | boolean                              |
//! | `int`     | `v`                           | integer within ±(2^53 - 1)           |
//! | `bigint`  | `v` (decimal string)          | integer outside the safe range       |
//! | `num`     | `v`                           | finite float                         |
//! | `nan`     |                               | NaN                                  |
//! | `inf`     | `s` (`1` or `-1`)             | signed infinity                      |
//! | `negzero` |                               | negative zero                        |
//! | `str`     | `v`                           | string                               |
//! | `date`    | `v` (RFC 3339, UTC)           | instant; years past 0000-9999 signed |
//! | `seq`     | `id`, `v` (array of nodes)    | sequence                             |
//! | `map`     | `id`, `v` (array of `[k, n]`) | mapping, entry order preserved       |
//! | `typed`   | `tag`, `ver`, `id`, `v`       | custom object and its payload node   |
//! | `ref`     | `id`                          | back or forward reference            |
//!
//! Ids are assigned in depth-first pre-order starting at 1.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{GraphError, GraphResult};
use crate::path::ValuePath;

/// Node id, unique within one document.
pub type NodeId = u64;

/// Largest integer a JSON number carries without loss in every consumer.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Wire kind names.
pub mod kind {
	pub const UNDEFINED: &str = "undef";
	pub const NULL: &str = "null";
	pub const BOOL: &str = "bool";
	pub const INT: &str = "int";
	pub const BIG_INT: &str = "bigint";
	pub const NUMBER: &str = "num";
	pub const NAN: &str = "nan";
	pub const INFINITY: &str = "inf";
	pub const NEGATIVE_ZERO: &str = "negzero";
	pub const STRING: &str = "str";
	pub const DATE: &str = "date";
	pub const SEQUENCE: &str = "seq";
	pub const MAPPING: &str = "map";
	pub const TYPED: &str = "typed";
	pub const REFERENCE: &str = "ref";
}

/// Leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
	Undefined,
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	DateTime(DateTime<Utc>),
}

impl Primitive {
	/// Wire kind this primitive is written as.
	pub fn kind(&self) -> &'static str {
		match self {
			Primitive::Undefined => kind::UNDEFINED,
			Primitive::Null => kind::NULL,
			Primitive::Bool(_) => kind::BOOL,
			Primitive::Int(i) if is_safe_integer(*i) => kind::INT,
			Primitive::Int(_) => kind::BIG_INT,
			Primitive::Float(f) if f.is_nan() => kind::NAN,
			Primitive::Float(f) if f.is_infinite() => kind::INFINITY,
			Primitive::Float(f) if *f == 0.0 && f.is_sign_negative() => kind::NEGATIVE_ZERO,
			Primitive::Float(_) => kind::NUMBER,
			Primitive::String(_) => kind::STRING,
			Primitive::DateTime(_) => kind::DATE,
		}
	}
}

pub(crate) fn is_safe_integer(i: i64) -> bool {
	(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i)
}

/// `%Y` writes a leading sign for years outside 0000-9999, which plain
/// RFC 3339 cannot express. `%.f` writes 0, 3, 6 or 9 fraction digits.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Canonical text of an instant: RFC 3339 in UTC with only as many
/// fractional digits as needed.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
	dt.format(DATE_FORMAT).to_string()
}

/// Parse a `date` value. Accepts any RFC 3339 offset, plus the signed
/// extended years written by [`format_datetime`].
pub(crate) fn parse_datetime(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
	DateTime::parse_from_rfc3339(text)
		.map(|dt| dt.with_timezone(&Utc))
		.or_else(|_| NaiveDateTime::parse_from_str(text, DATE_FORMAT).map(|dt| dt.and_utc()))
}

/// Tree form of an encoded graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Primitive(Primitive),
	/// Ordered items. `id` is absent only in hand-written documents.
	Sequence {
		id: Option<NodeId>,
		items: Vec<Node>,
	},
	/// Ordered entries with unique keys.
	Mapping {
		id: Option<NodeId>,
		entries: Vec<(String, Node)>,
	},
	/// Custom object: its tag, wire version and payload.
	Typed {
		tag: String,
		version: u32,
		id: NodeId,
		payload: Box<Node>,
	},
	/// Points at a sequence, mapping or typed node declared elsewhere.
	Reference(NodeId),
}

impl Node {
	/// Id declared by this node, if any.
	pub fn id(&self) -> Option<NodeId> {
		match self {
			Node::Sequence { id, .. } | Node::Mapping { id, .. } => *id,
			Node::Typed { id, .. } => Some(*id),
			Node::Primitive(_) | Node::Reference(_) => None,
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Node::Primitive(primitive) => primitive.kind(),
			Node::Sequence { .. } => kind::SEQUENCE,
			Node::Mapping { .. } => kind::MAPPING,
			Node::Typed { .. } => kind::TYPED,
			Node::Reference(_) => kind::REFERENCE,
		}
	}

	/// Ids declared anywhere in this tree, in pre-order.
	pub fn declared_ids(&self) -> Vec<NodeId> {
		let mut ids = Vec::new();
		let mut stack = vec![self];
		while let Some(node) = stack.pop() {
			if let Some(id) = node.id() {
				ids.push(id);
			}
			match node {
				Node::Sequence { items, .. } => stack.extend(items.iter().rev()),
				Node::Mapping { entries, .. } => {
					stack.extend(entries.iter().rev().map(|(_, child)| child))
				}
				Node::Typed { payload, .. } => stack.push(payload),
				Node::Primitive(_) | Node::Reference(_) => {}
			}
		}
		ids
	}

	/// Write the wire text: compact, or pretty-printed with `indent` spaces.
	///
	/// An indent of zero is the same as compact output.
	pub fn to_wire(&self, indent: Option<usize>) -> GraphResult<String> {
		match indent {
			None | Some(0) => Ok(serde_json::to_string(self)?),
			Some(width) => {
				let indent = vec![b' '; width];
				let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
				let mut out = Vec::new();
				let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
				self.serialize(&mut serializer)?;
				String::from_utf8(out).map_err(|err| GraphError::MalformedWire {
					path: ValuePath::root(),
					message: err.to_string(),
				})
			}
		}
	}
}

impl Serialize for Primitive {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(None)?;
		map.serialize_entry("k", self.kind())?;
		match self {
			Primitive::Undefined | Primitive::Null => {}
			Primitive::Bool(b) => map.serialize_entry("v", b)?,
			Primitive::Int(i) if is_safe_integer(*i) => map.serialize_entry("v", i)?,
			Primitive::Int(i) => map.serialize_entry("v", &i.to_string())?,
			Primitive::Float(f) if f.is_nan() => {}
			Primitive::Float(f) if f.is_infinite() => {
				map.serialize_entry("s", &if f.is_sign_positive() { 1 } else { -1 })?
			}
			Primitive::Float(f) if *f == 0.0 && f.is_sign_negative() => {}
			Primitive::Float(f) => map.serialize_entry("v", f)?,
			Primitive::String(s) => map.serialize_entry("v", s)?,
			Primitive::DateTime(dt) => map.serialize_entry("v", &format_datetime(dt))?,
		}
		map.end()
	}
}

impl Serialize for Node {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Node::Primitive(primitive) => primitive.serialize(serializer),
			Node::Sequence { id, items } => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("k", kind::SEQUENCE)?;
				if let Some(id) = id {
					map.serialize_entry("id", id)?;
				}
				map.serialize_entry("v", items)?;
				map.end()
			}
			Node::Mapping { id, entries } => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("k", kind::MAPPING)?;
				if let Some(id) = id {
					map.serialize_entry("id", id)?;
				}
				// Each entry is written as a two element array `[key, node]`.
				map.serialize_entry("v", entries)?;
				map.end()
			}
			Node::Typed {
				tag,
				version,
				id,
				payload,
			} => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("k", kind::TYPED)?;
				map.serialize_entry("tag", tag)?;
				map.serialize_entry("ver", version)?;
				map.serialize_entry("id", id)?;
				map.serialize_entry("v", payload)?;
				map.end()
			}
			Node::Reference(id) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("k", kind::REFERENCE)?;
				map.serialize_entry("id", id)?;
				map.end()
			}
		}
	}
}
