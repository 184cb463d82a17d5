//! Per-call traversal state
//!
//! An [`EncodingContext`] or [`DecodingContext`] is created for one top-level
//! call and dropped when it returns. Nothing in here is shared between calls,
//! so concurrent encodes of disjoint graphs never interfere.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::{GraphError, GraphResult};
use crate::ir::NodeId;
use crate::path::{PathSegment, ValuePath};
use crate::value::{PendingObject, Value};

/// Default nesting limit for both directions.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Encoder state: identity tracking, id assignment and depth.
#[derive(Debug)]
pub struct EncodingContext {
	/// Identity (allocation address) to assigned id
	seen: HashMap<usize, NodeId>,
	/// Handles kept alive until the call ends. An address stays a key in
	/// `seen` only while its allocation is alive, so every visited handle,
	/// including handler-produced payloads, is pinned here.
	pinned: Vec<Value>,
	next_id: NodeId,
	path: ValuePath,
	max_depth: usize,
	strict: bool,
}

impl EncodingContext {
	/// Create a context.
	///
	/// # Examples
	///
	/// ```
	/// use graphwire_core::context::EncodingContext;
	///
	/// let context = EncodingContext::new(3, true);
	/// assert_eq!(context.current_depth(), 0);
	/// assert_eq!(context.max_depth(), 3);
	/// assert_eq!(context.assigned(), 0);
	/// ```
	pub fn new(max_depth: usize, strict: bool) -> Self {
		Self {
			seen: HashMap::new(),
			pinned: Vec::new(),
			next_id: 1,
			path: ValuePath::root(),
			max_depth,
			strict,
		}
	}

	pub fn current_depth(&self) -> usize {
		self.path.depth()
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	pub fn remaining_depth(&self) -> usize {
		self.max_depth.saturating_sub(self.current_depth())
	}

	pub fn is_strict(&self) -> bool {
		self.strict
	}

	pub fn path(&self) -> &ValuePath {
		&self.path
	}

	/// Number of ids handed out so far.
	pub fn assigned(&self) -> usize {
		self.seen.len()
	}

	/// Id previously assigned to this value's identity, if any.
	pub fn lookup(&self, value: &Value) -> Option<NodeId> {
		value.identity().and_then(|addr| self.seen.get(&addr).copied())
	}

	/// Assign the next id to a reference-typed value and pin it.
	///
	/// Returns `None` for primitives, which have no identity.
	///
	/// # Examples
	///
	/// ```
	/// use graphwire_core::context::EncodingContext;
	/// use graphwire_core::Value;
	///
	/// let mut context = EncodingContext::new(8, true);
	/// let list = Value::list([]);
	///
	/// assert_eq!(context.assign(&list), Some(1));
	/// assert_eq!(context.lookup(&list.clone()), Some(1));
	/// assert_eq!(context.assign(&Value::Int(4)), None);
	/// ```
	pub fn assign(&mut self, value: &Value) -> Option<NodeId> {
		let addr = value.identity()?;
		Some(self.assign_identity(addr, value))
	}

	pub(crate) fn assign_identity(&mut self, addr: usize, handle: &Value) -> NodeId {
		let id = match self.seen.entry(addr) {
			Entry::Occupied(existing) => return *existing.get(),
			Entry::Vacant(slot) => *slot.insert(self.next_id),
		};
		self.next_id += 1;
		self.pinned.push(handle.clone());
		id
	}

	/// Keep a handler-produced value alive for the rest of the call.
	pub fn pin(&mut self, value: Value) {
		if value.is_reference() {
			self.pinned.push(value);
		}
	}

	/// Step into a child, failing when the depth limit would be exceeded.
	pub fn enter(&mut self, segment: PathSegment) -> GraphResult<()> {
		if self.current_depth() >= self.max_depth {
			return Err(GraphError::DepthLimitExceeded {
				path: self.path.clone(),
				max_depth: self.max_depth,
			});
		}
		self.path.push(segment);
		Ok(())
	}

	/// Step back out of the current child.
	pub fn leave(&mut self) {
		self.path.pop();
	}
}

impl Default for EncodingContext {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_DEPTH, true)
	}
}

/// Decoder state: the placeholder arena keyed by node id.
#[derive(Debug)]
pub struct DecodingContext {
	placeholders: HashMap<NodeId, Value>,
	path: ValuePath,
	max_depth: usize,
}

impl DecodingContext {
	pub fn new(max_depth: usize) -> Self {
		Self {
			placeholders: HashMap::new(),
			path: ValuePath::root(),
			max_depth,
		}
	}

	pub fn path(&self) -> &ValuePath {
		&self.path
	}

	pub fn current_depth(&self) -> usize {
		self.path.depth()
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	/// Number of placeholders allocated.
	pub fn len(&self) -> usize {
		self.placeholders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.placeholders.is_empty()
	}

	/// Register an empty placeholder under `id`.
	pub fn declare(&mut self, id: NodeId, placeholder: Value) -> GraphResult<()> {
		match self.placeholders.entry(id) {
			Entry::Occupied(_) => Err(GraphError::MalformedWire {
				path: self.path.clone(),
				message: format!("node id {} is declared more than once", id),
			}),
			Entry::Vacant(slot) => {
				slot.insert(placeholder);
				Ok(())
			}
		}
	}

	/// Handle currently bound to `id`, which may still be under construction.
	pub fn resolve(&self, id: NodeId) -> Option<Value> {
		self.placeholders.get(&id).cloned()
	}

	pub fn enter(&mut self, segment: PathSegment) -> GraphResult<()> {
		if self.current_depth() >= self.max_depth {
			return Err(GraphError::DepthLimitExceeded {
				path: self.path.clone(),
				max_depth: self.max_depth,
			});
		}
		self.path.push(segment);
		Ok(())
	}

	pub fn leave(&mut self) {
		self.path.pop();
	}

	/// Read-only view handed to decode handlers.
	pub(crate) fn resolver<'a>(&'a self, tag: &'a str, version: u32) -> Resolver<'a> {
		Resolver {
			tag,
			version,
			path: &self.path,
			placeholders: &self.placeholders,
		}
	}

	/// Empty every placeholder so a failed decode releases partially built
	/// cycles instead of leaking them.
	pub(crate) fn release(&mut self) {
		for (_, placeholder) in self.placeholders.drain() {
			match placeholder {
				Value::List(list) => list.clear(),
				Value::Map(map) => map.clear(),
				Value::Object(object) => {
					let tag = object.type_name();
					object.replace(Box::new(PendingObject::new(tag)));
				}
				_ => {}
			}
		}
	}
}

impl Default for DecodingContext {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_DEPTH)
	}
}

/// Handle given to a descriptor's decode function.
pub struct Resolver<'a> {
	tag: &'a str,
	version: u32,
	path: &'a ValuePath,
	placeholders: &'a HashMap<NodeId, Value>,
}

impl<'a> Resolver<'a> {
	/// Tag of the node being decoded.
	pub fn tag(&self) -> &str {
		self.tag
	}

	/// Version written on the wire for this node.
	pub fn version(&self) -> u32 {
		self.version
	}

	/// Location of the node being decoded.
	pub fn path(&self) -> &ValuePath {
		self.path
	}

	/// Placeholder for another node of the same document.
	pub fn lookup(&self, id: NodeId) -> Option<Value> {
		self.placeholders.get(&id).cloned()
	}
}
