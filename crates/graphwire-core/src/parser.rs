//! Wire text to [`Node`] tree
//!
//! Parsing is purely syntactic: it checks the node grammar, id uniqueness and
//! nesting depth, but resolves neither references nor type tags. That is left
//! to the decoder, which knows the registry.

use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::collections::HashSet;

use crate::context::DEFAULT_MAX_DEPTH;
use crate::error::{GraphError, GraphResult};
use crate::ir::{NodeId, Node, Primitive, kind, parse_datetime};
use crate::path::{PathSegment, ValuePath};

/// JSON nesting allowed per graph level: a mapping entry costs three
/// (node object, entry array, child node).
const JSON_LEVELS_PER_NODE: usize = 3;

/// Parse wire text with the default depth limit.
pub fn parse(text: &str) -> GraphResult<Node> {
	parse_with_limit(text, DEFAULT_MAX_DEPTH)
}

/// Parse wire text, rejecting graphs nested deeper than `max_depth`.
pub fn parse_with_limit(text: &str, max_depth: usize) -> GraphResult<Node> {
	check_nesting(text, max_depth)?;

	let mut deserializer = serde_json::Deserializer::from_str(text);
	// Nesting was bounded above; the builtin limit of 128 would cap graphs
	// at roughly 40 levels.
	deserializer.disable_recursion_limit();
	let json = Json::deserialize(&mut deserializer)?;
	deserializer.end()?;

	NodeParser::new(max_depth).parse_node(&json)
}

/// Convert an already parsed JSON document.
pub fn from_json(json: &Json) -> GraphResult<Node> {
	NodeParser::new(DEFAULT_MAX_DEPTH).parse_node(json)
}

/// Reject documents whose bracket nesting exceeds what `max_depth` graph
/// levels can produce, before handing them to the recursive JSON parser.
fn check_nesting(text: &str, max_depth: usize) -> GraphResult<()> {
	let limit = max_depth
		.saturating_mul(JSON_LEVELS_PER_NODE)
		.saturating_add(JSON_LEVELS_PER_NODE);
	let mut depth = 0usize;
	let mut in_string = false;
	let mut escaped = false;

	for byte in text.bytes() {
		if in_string {
			match byte {
				_ if escaped => escaped = false,
				b'\\' => escaped = true,
				b'"' => in_string = false,
				_ => {}
			}
			continue;
		}
		match byte {
			b'"' => in_string = true,
			b'[' | b'{' => {
				depth += 1;
				if depth > limit {
					return Err(GraphError::DepthLimitExceeded {
						path: ValuePath::root(),
						max_depth,
					});
				}
			}
			b']' | b'}' => depth = depth.saturating_sub(1),
			_ => {}
		}
	}
	Ok(())
}

struct NodeParser {
	path: ValuePath,
	declared: HashSet<NodeId>,
	max_depth: usize,
}

impl NodeParser {
	fn new(max_depth: usize) -> Self {
		Self {
			path: ValuePath::root(),
			declared: HashSet::new(),
			max_depth,
		}
	}

	fn malformed(&self, message: impl Into<String>) -> GraphError {
		GraphError::MalformedWire {
			path: self.path.clone(),
			message: message.into(),
		}
	}

	fn descend<T>(
		&mut self,
		segment: PathSegment,
		f: impl FnOnce(&mut Self) -> GraphResult<T>,
	) -> GraphResult<T> {
		if self.path.depth() >= self.max_depth {
			return Err(GraphError::DepthLimitExceeded {
				path: self.path.clone(),
				max_depth: self.max_depth,
			});
		}
		self.path.push(segment);
		let result = f(self);
		self.path.pop();
		result
	}

	fn parse_node(&mut self, json: &Json) -> GraphResult<Node> {
		let object = json
			.as_object()
			.ok_or_else(|| self.malformed(format!("expected a node object, found {}", json_kind(json))))?;
		let node_kind = object
			.get("k")
			.and_then(Json::as_str)
			.ok_or_else(|| self.malformed("node is missing its \"k\" kind"))?;

		match node_kind {
			kind::UNDEFINED => Ok(Node::Primitive(Primitive::Undefined)),
			kind::NULL => Ok(Node::Primitive(Primitive::Null)),
			kind::BOOL => {
				let b = self.field(object, "v")?.as_bool().ok_or_else(|| self.malformed("bool value must be true or false"))?;
				Ok(Node::Primitive(Primitive::Bool(b)))
			}
			kind::INT => {
				let i = self
					.field(object, "v")?
					.as_i64()
					.ok_or_else(|| self.malformed("int value must be an integer"))?;
				Ok(Node::Primitive(Primitive::Int(i)))
			}
			kind::BIG_INT => {
				let text = self.string_field(object, "v")?;
				let i = text
					.parse::<i64>()
					.map_err(|_| self.malformed(format!("bigint '{}' is not a 64-bit integer", text)))?;
				Ok(Node::Primitive(Primitive::Int(i)))
			}
			kind::NUMBER => {
				let f = self
					.field(object, "v")?
					.as_f64()
					.ok_or_else(|| self.malformed("num value must be a number"))?;
				Ok(Node::Primitive(Primitive::Float(f)))
			}
			kind::NAN => Ok(Node::Primitive(Primitive::Float(f64::NAN))),
			kind::INFINITY => match self.field(object, "s")?.as_i64() {
				Some(1) => Ok(Node::Primitive(Primitive::Float(f64::INFINITY))),
				Some(-1) => Ok(Node::Primitive(Primitive::Float(f64::NEG_INFINITY))),
				_ => Err(self.malformed("inf sign must be 1 or -1")),
			},
			kind::NEGATIVE_ZERO => Ok(Node::Primitive(Primitive::Float(-0.0))),
			kind::STRING => Ok(Node::Primitive(Primitive::String(
				self.string_field(object, "v")?.to_string(),
			))),
			kind::DATE => {
				let text = self.string_field(object, "v")?;
				let dt = parse_datetime(text)
					.map_err(|err| self.malformed(format!("invalid date '{}': {}", text, err)))?;
				Ok(Node::Primitive(Primitive::DateTime(dt)))
			}
			kind::SEQUENCE => self.parse_sequence(object),
			kind::MAPPING => self.parse_mapping(object),
			kind::TYPED => self.parse_typed(object),
			kind::REFERENCE => Ok(Node::Reference(self.id_field(object)?)),
			other => Err(self.malformed(format!("unknown node kind '{}'", other))),
		}
	}

	fn parse_sequence(&mut self, object: &Map<String, Json>) -> GraphResult<Node> {
		let id = self.optional_id(object)?;
		let items = self
			.field(object, "v")?
			.as_array()
			.ok_or_else(|| self.malformed("seq value must be an array"))?;

		let mut nodes = Vec::with_capacity(items.len());
		for (index, item) in items.iter().enumerate() {
			nodes.push(self.descend(PathSegment::Index(index), |p| p.parse_node(item))?);
		}
		Ok(Node::Sequence { id, items: nodes })
	}

	fn parse_mapping(&mut self, object: &Map<String, Json>) -> GraphResult<Node> {
		let id = self.optional_id(object)?;
		let entries = self
			.field(object, "v")?
			.as_array()
			.ok_or_else(|| self.malformed("map value must be an array of [key, node] pairs"))?;

		let mut keys = HashSet::with_capacity(entries.len());
		let mut nodes = Vec::with_capacity(entries.len());
		for entry in entries {
			let (key, child) = match entry.as_array().map(Vec::as_slice) {
				Some([Json::String(key), child]) => (key, child),
				_ => return Err(self.malformed("map entry must be a [key, node] pair")),
			};
			if !keys.insert(key.as_str()) {
				return Err(self.malformed(format!("duplicate map key '{}'", key)));
			}
			let node = self.descend(PathSegment::Key(key.clone()), |p| p.parse_node(child))?;
			nodes.push((key.clone(), node));
		}
		Ok(Node::Mapping { id, entries: nodes })
	}

	fn parse_typed(&mut self, object: &Map<String, Json>) -> GraphResult<Node> {
		let tag = self.string_field(object, "tag")?.to_string();
		if tag.is_empty() {
			return Err(self.malformed("typed node has an empty tag"));
		}
		let version = self
			.field(object, "ver")?
			.as_u64()
			.and_then(|v| u32::try_from(v).ok())
			.filter(|v| *v >= 1)
			.ok_or_else(|| self.malformed("typed version must be a positive integer"))?;
		let id = self.id_field(object)?;
		self.declare(id)?;
		let payload = self.field(object, "v")?;
		let payload = self.descend(PathSegment::Payload(tag.clone()), |p| p.parse_node(payload))?;

		Ok(Node::Typed {
			tag,
			version,
			id,
			payload: Box::new(payload),
		})
	}

	fn field<'j>(&self, object: &'j Map<String, Json>, name: &str) -> GraphResult<&'j Json> {
		object
			.get(name)
			.ok_or_else(|| self.malformed(format!("node is missing \"{}\"", name)))
	}

	fn string_field<'j>(&self, object: &'j Map<String, Json>, name: &str) -> GraphResult<&'j str> {
		self.field(object, name)?
			.as_str()
			.ok_or_else(|| self.malformed(format!("\"{}\" must be a string", name)))
	}

	fn id_field(&self, object: &Map<String, Json>) -> GraphResult<NodeId> {
		self.field(object, "id")?
			.as_u64()
			.filter(|id| *id >= 1)
			.ok_or_else(|| self.malformed("node id must be a positive integer"))
	}

	fn optional_id(&mut self, object: &Map<String, Json>) -> GraphResult<Option<NodeId>> {
		if !object.contains_key("id") {
			return Ok(None);
		}
		let id = self.id_field(object)?;
		self.declare(id)?;
		Ok(Some(id))
	}

	fn declare(&mut self, id: NodeId) -> GraphResult<()> {
		if self.declared.insert(id) {
			Ok(())
		} else {
			Err(self.malformed(format!("node id {} is declared more than once", id)))
		}
	}
}

fn json_kind(json: &Json) -> &'static str {
	match json {
		Json::Null => "null",
		Json::Bool(_) => "a boolean",
		Json::Number(_) => "a number",
		Json::String(_) => "a string",
		Json::Array(_) => "an array",
		Json::Object(_) => "an object",
	}
}
