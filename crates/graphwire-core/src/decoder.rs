//! IR to value graph
//!
//! Decoding runs in two passes over the tree. The first allocates an empty
//! placeholder for every node that declares an id, so that references can be
//! bound regardless of whether they point backwards or forwards. The second
//! fills the placeholders in place. Typed nodes are finalized bottom-up by
//! swapping the decoded object into the shell handle, which every earlier
//! reference already shares.

use crate::context::DecodingContext;
use crate::error::{GraphError, GraphResult};
use crate::ir::{Node, NodeId, Primitive};
use crate::path::PathSegment;
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::value::{ListRef, MapRef, ObjectRef, Value};
use std::sync::Arc;

/// Single-use graph builder.
pub struct Decoder<'r> {
	registry: &'r TypeRegistry,
	context: DecodingContext,
}

impl<'r> Decoder<'r> {
	pub fn new(registry: &'r TypeRegistry, context: DecodingContext) -> Self {
		Self { registry, context }
	}

	/// Rebuild the graph described by `root`.
	pub fn decode(mut self, root: &Node) -> GraphResult<Value> {
		let result = self.allocate(root).and_then(|()| self.populate(root));
		match result {
			Ok(value) => {
				tracing::debug!(placeholders = self.context.len(), "decoded value graph");
				Ok(value)
			}
			Err(err) => {
				self.context.release();
				Err(err)
			}
		}
	}

	fn descend<T>(
		&mut self,
		segment: PathSegment,
		f: impl FnOnce(&mut Self) -> GraphResult<T>,
	) -> GraphResult<T> {
		self.context.enter(segment)?;
		let result = f(self);
		self.context.leave();
		result
	}

	fn descriptor(&self, tag: &str, version: u32) -> GraphResult<&'r Arc<TypeDescriptor>> {
		let registry = self.registry;
		let descriptor = registry
			.resolve_for_decode(tag)
			.map_err(|_| GraphError::UnknownTypeTag {
				path: self.context.path().clone(),
				tag: tag.to_string(),
			})?;
		if !descriptor.supports(version) {
			return Err(GraphError::VersionMismatch {
				path: self.context.path().clone(),
				tag: tag.to_string(),
				found: version,
				min: descriptor.min_version(),
				max: descriptor.version(),
			});
		}
		Ok(descriptor)
	}

	/// Pass one: create empty placeholders keyed by id.
	fn allocate(&mut self, node: &Node) -> GraphResult<()> {
		match node {
			Node::Primitive(_) | Node::Reference(_) => Ok(()),
			Node::Sequence { id, items } => {
				if let Some(id) = id {
					self.context.declare(*id, Value::List(ListRef::new()))?;
				}
				for (index, item) in items.iter().enumerate() {
					self.descend(PathSegment::Index(index), |d| d.allocate(item))?;
				}
				Ok(())
			}
			Node::Mapping { id, entries } => {
				if let Some(id) = id {
					self.context.declare(*id, Value::Map(MapRef::new()))?;
				}
				for (key, child) in entries {
					self.descend(PathSegment::Key(key.clone()), |d| d.allocate(child))?;
				}
				Ok(())
			}
			Node::Typed {
				tag,
				version,
				id,
				payload,
			} => {
				let descriptor = self.descriptor(tag, *version)?;
				self.context
					.declare(*id, Value::Object(ObjectRef::from_box(descriptor.shell())))?;
				self.descend(PathSegment::Payload(tag.clone()), |d| d.allocate(payload))
			}
		}
	}

	fn placeholder(&self, id: NodeId) -> GraphResult<Value> {
		self.context
			.resolve(id)
			.ok_or_else(|| GraphError::MalformedWire {
				path: self.context.path().clone(),
				message: format!("node id {} was not allocated", id),
			})
	}

	/// Pass two: fill placeholders and bind references.
	fn populate(&mut self, node: &Node) -> GraphResult<Value> {
		match node {
			Node::Primitive(primitive) => Ok(primitive_value(primitive)),
			Node::Reference(id) => {
				self.context
					.resolve(*id)
					.ok_or_else(|| GraphError::MalformedReference {
						path: self.context.path().clone(),
						id: *id,
					})
			}
			Node::Sequence { id, items } => {
				let list = match id {
					Some(id) => self.placeholder(*id)?,
					None => Value::List(ListRef::new()),
				};
				let Value::List(target) = &list else {
					return Err(self.shape_conflict("list", &list));
				};
				for (index, item) in items.iter().enumerate() {
					let value = self.descend(PathSegment::Index(index), |d| d.populate(item))?;
					target.push(value);
				}
				Ok(list)
			}
			Node::Mapping { id, entries } => {
				let map = match id {
					Some(id) => self.placeholder(*id)?,
					None => Value::Map(MapRef::new()),
				};
				let Value::Map(target) = &map else {
					return Err(self.shape_conflict("map", &map));
				};
				for (key, child) in entries {
					let value = self.descend(PathSegment::Key(key.clone()), |d| d.populate(child))?;
					target.insert(key.clone(), value);
				}
				Ok(map)
			}
			Node::Typed {
				tag,
				version,
				id,
				payload,
			} => {
				let handle = self.placeholder(*id)?;
				let Value::Object(shell) = &handle else {
					return Err(self.shape_conflict("object", &handle));
				};
				let descriptor = self.descriptor(tag, *version)?;

				let object = self.descend(PathSegment::Payload(tag.clone()), |d| {
					let payload = d.populate(payload)?;
					tracing::trace!(tag = %tag, version, path = %d.context.path(), "finalizing typed object");
					let resolver = d.context.resolver(tag, *version);
					descriptor
						.decode(payload, &resolver)
						.map_err(|err| GraphError::from_handler(err, d.context.path(), tag))
				})?;

				shell.replace(object);
				Ok(handle)
			}
		}
	}

	fn shape_conflict(&self, expected: &str, found: &Value) -> GraphError {
		GraphError::MalformedWire {
			path: self.context.path().clone(),
			message: format!("expected a {} placeholder, found {}", expected, found.kind_name()),
		}
	}
}

fn primitive_value(primitive: &Primitive) -> Value {
	match primitive {
		Primitive::Undefined => Value::Undefined,
		Primitive::Null => Value::Null,
		Primitive::Bool(b) => Value::Bool(*b),
		Primitive::Int(i) => Value::Int(*i),
		Primitive::Float(f) => Value::Float(*f),
		Primitive::String(s) => Value::String(s.clone()),
		Primitive::DateTime(dt) => Value::DateTime(*dt),
	}
}
