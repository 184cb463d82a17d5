//! Engine entry points
//!
//! [`GraphSerializer`] ties the encoder, writer, parser and decoder to one
//! registry snapshot and configuration. The free functions at the bottom of
//! this module use the process-wide registry.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::SerializerConfig;
use crate::context::{DecodingContext, EncodingContext};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{GraphError, GraphResult};
use crate::ir::Node;
use crate::oracle::Oracle;
use crate::parser::parse_with_limit;
use crate::path::{PathSegment, ValuePath};
use crate::registry::{HookFn, TypeDescriptor, TypeRegistry, global_registry, load_registered_types};
use crate::value::Value;

/// Conversion between an input representation and its serialized form.
pub trait Serializer {
	type Input;
	type Output;

	fn serialize(&self, input: &Self::Input) -> GraphResult<Self::Output>;
	fn deserialize(&self, output: &Self::Output) -> GraphResult<Self::Input>;
}

type HookSelector = for<'a> fn(&'a TypeDescriptor) -> Option<&'a HookFn>;

/// Encodes value graphs to wire text and back.
///
/// # Examples
///
/// ```
/// use graphwire_core::{GraphSerializer, TypeRegistry, Value};
///
/// let serializer = GraphSerializer::new(TypeRegistry::new());
/// let shared = Value::list([Value::Int(1)]);
/// let root = Value::map([("x", shared.clone()), ("y", shared)]);
///
/// let text = serializer.serialize(&root).unwrap();
/// let decoded = serializer.deserialize(&text).unwrap();
///
/// let map = decoded.as_map().unwrap();
/// assert!(map.get("x").unwrap().same_identity(&map.get("y").unwrap()));
/// ```
#[derive(Debug, Clone)]
pub struct GraphSerializer {
	registry: Arc<TypeRegistry>,
	config: SerializerConfig,
}

impl GraphSerializer {
	pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
		Self {
			registry: registry.into(),
			config: SerializerConfig::default(),
		}
	}

	/// Serializer over the process-wide registry, with every
	/// compile-time registration installed.
	pub fn global() -> GraphResult<Self> {
		load_registered_types()?;
		Ok(Self::new(global_registry()))
	}

	pub fn with_config(mut self, config: SerializerConfig) -> Self {
		self.config = config;
		self
	}

	pub fn registry(&self) -> &TypeRegistry {
		&self.registry
	}

	pub fn config(&self) -> &SerializerConfig {
		&self.config
	}

	/// Value graph to IR.
	pub fn encode_ir(&self, value: &Value) -> GraphResult<Node> {
		let context = EncodingContext::new(self.config.max_depth, self.config.strict);
		Encoder::new(&self.registry, context).encode(value)
	}

	/// IR to value graph.
	pub fn decode_ir(&self, node: &Node) -> GraphResult<Value> {
		let context = DecodingContext::new(self.config.max_depth);
		Decoder::new(&self.registry, context).decode(node)
	}

	/// Wire text using the configured indent.
	pub fn serialize(&self, value: &Value) -> GraphResult<String> {
		let text = self.encode_ir(value)?.to_wire(self.config.indent)?;
		tracing::debug!(bytes = text.len(), "serialized value graph");
		Ok(text)
	}

	/// Wire text pretty-printed with `indent` spaces (zero is compact).
	pub fn serialize_with_indent(&self, value: &Value, indent: usize) -> GraphResult<String> {
		self.encode_ir(value)?.to_wire(Some(indent))
	}

	pub fn deserialize(&self, text: &str) -> GraphResult<Value> {
		tracing::debug!(bytes = text.len(), "deserializing value graph");
		let node = parse_with_limit(text, self.config.max_depth)?;
		self.decode_ir(&node)
	}

	/// Deep equality under this serializer's registry.
	pub fn deep_equal(&self, a: &Value, b: &Value) -> bool {
		Oracle::new(&self.registry).deep_equal(a, b)
	}

	/// Await every `prepare` hook in the graph, then serialize.
	pub async fn serialize_async(&self, value: &Value) -> GraphResult<String> {
		self.run_hooks(value, TypeDescriptor::prepare_hook).await?;
		self.serialize(value)
	}

	/// Deserialize, then await every `hydrate` hook in the decoded graph.
	pub async fn deserialize_async(&self, text: &str) -> GraphResult<Value> {
		let value = self.deserialize(text)?;
		self.run_hooks(&value, TypeDescriptor::hydrate_hook).await?;
		Ok(value)
	}

	/// Visit each distinct object once, parents before the objects reachable
	/// through their payloads, awaiting its hook if it has one.
	///
	/// No lock is held across an await; payloads are computed after the hook
	/// so a `prepare` hook can load what the encoder will read.
	async fn run_hooks(&self, root: &Value, select: HookSelector) -> GraphResult<usize> {
		if !self.registry.iter().any(|descriptor| select(descriptor).is_some()) {
			return Ok(0);
		}

		let mut seen = HashSet::new();
		// Payloads are fresh allocations. Holding every walked value keeps its
		// address out of reuse while it is a key in `seen`.
		let mut pinned = Vec::new();
		let mut pending = vec![(root.clone(), ValuePath::root())];
		let mut ran = 0;

		while let Some((value, path)) = pending.pop() {
			let Some(addr) = value.identity() else {
				continue;
			};
			if !seen.insert(addr) {
				continue;
			}

			match &value {
				Value::List(list) => {
					for (index, item) in list.snapshot().into_iter().enumerate().rev() {
						pending.push((item, child_path(&path, PathSegment::Index(index))));
					}
				}
				Value::Map(map) => {
					for (key, item) in map.snapshot().into_iter().rev() {
						pending.push((item, child_path(&path, PathSegment::Key(key))));
					}
				}
				Value::Object(object) => {
					if let Some(descriptor) = self.registry.resolve_for_encode(&value) {
						if let Some(hook) = select(descriptor) {
							hook(object.clone())
								.await
								.map_err(|err| GraphError::from_handler(err, &path, descriptor.tag()))?;
							ran += 1;
						}
						let payload = {
							let guard = object.read();
							descriptor.encode(&**guard)
						}
						.map_err(|err| GraphError::from_handler(err, &path, descriptor.tag()))?;
						let payload_path =
							child_path(&path, PathSegment::Payload(descriptor.tag().to_string()));
						pending.push((payload, payload_path));
					}
				}
				_ => {}
			}
			pinned.push(value);
		}

		tracing::debug!(hooks = ran, values = pinned.len(), "ran object hooks");
		Ok(ran)
	}
}

fn child_path(parent: &ValuePath, segment: PathSegment) -> ValuePath {
	let mut path = parent.clone();
	path.push(segment);
	path
}

impl Serializer for GraphSerializer {
	type Input = Value;
	type Output = String;

	fn serialize(&self, input: &Value) -> GraphResult<String> {
		GraphSerializer::serialize(self, input)
	}

	fn deserialize(&self, output: &String) -> GraphResult<Value> {
		GraphSerializer::deserialize(self, output)
	}
}

/// Serialize with the process-wide registry.
pub fn serialize(value: &Value) -> GraphResult<String> {
	GraphSerializer::global()?.serialize(value)
}

/// Serialize with the process-wide registry, pretty-printed.
pub fn serialize_with_indent(value: &Value, indent: usize) -> GraphResult<String> {
	GraphSerializer::global()?.serialize_with_indent(value, indent)
}

/// Deserialize with the process-wide registry.
pub fn deserialize(text: &str) -> GraphResult<Value> {
	GraphSerializer::global()?.deserialize(text)
}

/// Deep equality with the process-wide registry.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
	if let Err(e) = load_registered_types() {
		tracing::warn!("Comparing without registered types: {}", e);
	}
	Oracle::new(&global_registry()).deep_equal(a, b)
}
