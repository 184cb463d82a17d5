//! Value graph to IR
//!
//! The walker is depth-first. Each reference-typed value gets an id the first
//! time it is reached; every later occurrence becomes a reference node, which
//! is what makes cycles terminate and sharing survive.

use crate::context::EncodingContext;
use crate::error::{GraphError, GraphResult};
use crate::ir::{Node, NodeId, Primitive};
use crate::path::PathSegment;
use crate::registry::TypeRegistry;
use crate::value::{ListRef, MapRef, ObjectRef, Value};

/// Single-use graph walker.
pub struct Encoder<'r> {
	registry: &'r TypeRegistry,
	context: EncodingContext,
}

impl<'r> Encoder<'r> {
	pub fn new(registry: &'r TypeRegistry, context: EncodingContext) -> Self {
		Self { registry, context }
	}

	/// Encode the graph rooted at `root`.
	///
	/// Either the whole graph is encoded or an error is returned; no partial
	/// tree escapes.
	pub fn encode(mut self, root: &Value) -> GraphResult<Node> {
		let node = self.encode_value(root)?;
		tracing::debug!(nodes = self.context.assigned(), "encoded value graph");
		Ok(node)
	}

	fn descend(
		&mut self,
		segment: PathSegment,
		value: &Value,
	) -> GraphResult<Node> {
		self.context.enter(segment)?;
		let node = self.encode_value(value);
		self.context.leave();
		node
	}

	fn encode_value(&mut self, value: &Value) -> GraphResult<Node> {
		if let Some(id) = self.context.lookup(value) {
			tracing::trace!(id, path = %self.context.path(), "emitting reference");
			return Ok(Node::Reference(id));
		}

		match value {
			Value::Undefined => Ok(Node::Primitive(Primitive::Undefined)),
			Value::Null => Ok(Node::Primitive(Primitive::Null)),
			Value::Bool(b) => Ok(Node::Primitive(Primitive::Bool(*b))),
			Value::Int(i) => Ok(Node::Primitive(Primitive::Int(*i))),
			Value::Float(f) => Ok(Node::Primitive(Primitive::Float(*f))),
			Value::String(s) => Ok(Node::Primitive(Primitive::String(s.clone()))),
			Value::DateTime(dt) => Ok(Node::Primitive(Primitive::DateTime(*dt))),
			Value::List(list) => {
				let id = self.context.assign_identity(list.identity(), value);
				self.encode_list(id, list)
			}
			Value::Map(map) => {
				let id = self.context.assign_identity(map.identity(), value);
				self.encode_map(id, map)
			}
			Value::Object(object) => {
				let id = self.context.assign_identity(object.identity(), value);
				self.encode_object(id, value, object)
			}
		}
	}

	fn encode_list(&mut self, id: NodeId, list: &ListRef) -> GraphResult<Node> {
		let items = list.snapshot();
		let mut nodes = Vec::with_capacity(items.len());
		for (index, item) in items.iter().enumerate() {
			nodes.push(self.descend(PathSegment::Index(index), item)?);
		}
		Ok(Node::Sequence {
			id: Some(id),
			items: nodes,
		})
	}

	fn encode_map(&mut self, id: NodeId, map: &MapRef) -> GraphResult<Node> {
		let entries = map.snapshot();
		let mut nodes = Vec::with_capacity(entries.len());
		for (key, item) in &entries {
			let node = self.descend(PathSegment::Key(key.clone()), item)?;
			nodes.push((key.clone(), node));
		}
		Ok(Node::Mapping {
			id: Some(id),
			entries: nodes,
		})
	}

	fn encode_object(&mut self, id: NodeId, value: &Value, object: &ObjectRef) -> GraphResult<Node> {
		let registry = self.registry;
		let Some(descriptor) = registry.resolve_for_encode(value) else {
			return self.encode_unregistered(id, object);
		};

		tracing::trace!(id, tag = descriptor.tag(), path = %self.context.path(), "encoding typed object");
		let payload = {
			let guard = object.read();
			descriptor.encode(&**guard)
		}
		.map_err(|err| GraphError::from_handler(err, self.context.path(), descriptor.tag()))?;

		self.context.pin(payload.clone());
		let payload = self.descend(PathSegment::Payload(descriptor.tag().to_string()), &payload)?;

		Ok(Node::Typed {
			tag: descriptor.tag().to_string(),
			version: descriptor.version(),
			id,
			payload: Box::new(payload),
		})
	}

	/// Structural fallback for objects no descriptor claims.
	///
	/// The structure is written under the object's own id, so references to
	/// the object elsewhere in the graph still resolve. It decodes as a plain
	/// list or map, not as the original type.
	fn encode_unregistered(&mut self, id: NodeId, object: &ObjectRef) -> GraphResult<Node> {
		let type_name = object.type_name();
		let unregistered = |context: &EncodingContext| GraphError::UnregisteredType {
			path: context.path().clone(),
			type_name: type_name.clone(),
		};

		if self.context.is_strict() {
			return Err(unregistered(&self.context));
		}

		let structure = object.read().structure();
		match structure {
			Some(Value::List(list)) => {
				tracing::warn!(type_name = %type_name, path = %self.context.path(), "no descriptor registered, encoding structure as a sequence");
				self.context.pin(Value::List(list.clone()));
				self.encode_list(id, &list)
			}
			Some(Value::Map(map)) => {
				tracing::warn!(type_name = %type_name, path = %self.context.path(), "no descriptor registered, encoding structure as a mapping");
				self.context.pin(Value::Map(map.clone()));
				self.encode_map(id, &map)
			}
			_ => Err(unregistered(&self.context)),
		}
	}
}
