//! In-memory value graph
//!
//! Values are either primitives, held inline, or reference-typed handles
//! (`ListRef`, `MapRef`, `ObjectRef`). Cloning a handle shares the underlying
//! container, so the same list can be reachable from several places, or from
//! itself. Two handles denote the same object when they point at the same
//! allocation; [`Value::same_identity`] exposes that test.
//!
//! Containers use interior mutability so graphs (including cycles) can be
//! built after allocation, which the decoder relies on when it fills
//! placeholders in place.
//!
//! Handles are reference counted, so a cyclic graph keeps itself alive. This
//! includes graphs returned by `deserialize`. Break the cycle (for example with
//! [`ListRef::clear`] or [`MapRef::clear`]) once the graph is no longer needed.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::HandlerError;

/// A domain object that the engine can carry inside a [`Value`].
///
/// Implementors are opaque to the engine; a registered
/// [`TypeDescriptor`](crate::registry::TypeDescriptor) supplies the
/// encode/decode contract for them.
pub trait CustomObject: Any + Send + Sync + fmt::Debug {
	/// Human readable type name, used in error messages.
	fn type_name(&self) -> &str;

	/// Upcast for downcasting to the concrete type.
	fn as_any(&self) -> &dyn Any;

	/// Mutable upcast for downcasting to the concrete type.
	fn as_any_mut(&mut self) -> &mut dyn Any;

	/// Plain structural representation of this object, if it has one.
	///
	/// Only consulted when strict mode is disabled and no descriptor matches.
	fn structure(&self) -> Option<Value> {
		None
	}
}

/// Stand-in object allocated by the decoder before a typed node is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingObject {
	tag: String,
}

impl PendingObject {
	/// Create a shell for the given type tag.
	pub fn new(tag: impl Into<String>) -> Self {
		Self { tag: tag.into() }
	}

	/// Type tag this shell stands in for.
	pub fn tag(&self) -> &str {
		&self.tag
	}
}

impl CustomObject for PendingObject {
	fn type_name(&self) -> &str {
		&self.tag
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

/// A node of the in-memory value graph.
#[derive(Clone, Debug)]
pub enum Value {
	/// Absent value, distinct from `Null`
	Undefined,
	/// Explicit null
	Null,
	/// Boolean
	Bool(bool),
	/// 64-bit signed integer
	Int(i64),
	/// IEEE 754 double, including NaN, infinities and negative zero
	Float(f64),
	/// UTF-8 string
	String(String),
	/// Instant in time
	DateTime(DateTime<Utc>),
	/// Shared ordered sequence
	List(ListRef),
	/// Shared mapping preserving insertion order
	Map(MapRef),
	/// Shared custom object
	Object(ObjectRef),
}

impl Value {
	/// Build a new list value from items.
	pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
		Value::List(ListRef::from_vec(items.into_iter().collect()))
	}

	/// Build a new map value from entries. Later duplicates overwrite earlier ones.
	pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
		Value::Map(MapRef::from_entries(entries))
	}

	/// Wrap a custom object in a new shared handle.
	pub fn object<T: CustomObject>(object: T) -> Self {
		Value::Object(ObjectRef::new(object))
	}

	/// Short name of this value's kind, used in diagnostics.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::Undefined => "undefined",
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::String(_) => "string",
			Value::DateTime(_) => "datetime",
			Value::List(_) => "list",
			Value::Map(_) => "map",
			Value::Object(_) => "object",
		}
	}

	/// Whether this value is a shared handle with identity.
	pub fn is_reference(&self) -> bool {
		self.identity().is_some()
	}

	/// Address of the shared allocation, for reference-typed values.
	pub fn identity(&self) -> Option<usize> {
		match self {
			Value::List(list) => Some(list.identity()),
			Value::Map(map) => Some(map.identity()),
			Value::Object(object) => Some(object.identity()),
			_ => None,
		}
	}

	/// Whether both values are handles to the same allocation.
	pub fn same_identity(&self, other: &Value) -> bool {
		match (self.identity(), other.identity()) {
			(Some(a), Some(b)) => a == b,
			_ => false,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn is_undefined(&self) -> bool {
		matches!(self, Value::Undefined)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	/// Numeric view; integers are widened.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Float(f) => Some(*f),
			Value::Int(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
		match self {
			Value::DateTime(dt) => Some(dt),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&ListRef> {
		match self {
			Value::List(list) => Some(list),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&MapRef> {
		match self {
			Value::Map(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<&ObjectRef> {
		match self {
			Value::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Require a list, reporting a structural mismatch otherwise.
	///
	/// Intended for decode handlers inspecting their payload.
	pub fn expect_list(&self) -> Result<&ListRef, HandlerError> {
		self.as_list().ok_or_else(|| HandlerError::mismatch("list", self))
	}

	/// Require a map, reporting a structural mismatch otherwise.
	pub fn expect_map(&self) -> Result<&MapRef, HandlerError> {
		self.as_map().ok_or_else(|| HandlerError::mismatch("map", self))
	}

	/// Require a string, reporting a structural mismatch otherwise.
	pub fn expect_str(&self) -> Result<&str, HandlerError> {
		self.as_str().ok_or_else(|| HandlerError::mismatch("string", self))
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<i32> for Value {
	fn from(i: i32) -> Self {
		Value::Int(i64::from(i))
	}
}

impl From<f64> for Value {
	fn from(f: f64) -> Self {
		Value::Float(f)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(dt: DateTime<Utc>) -> Self {
		Value::DateTime(dt)
	}
}

impl From<ListRef> for Value {
	fn from(list: ListRef) -> Self {
		Value::List(list)
	}
}

impl From<MapRef> for Value {
	fn from(map: MapRef) -> Self {
		Value::Map(map)
	}
}

impl From<ObjectRef> for Value {
	fn from(object: ObjectRef) -> Self {
		Value::Object(object)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(opt: Option<T>) -> Self {
		opt.map(Into::into).unwrap_or(Value::Null)
	}
}

fn address<T: ?Sized>(arc: &Arc<T>) -> usize {
	Arc::as_ptr(arc) as *const () as usize
}

/// Shared, mutable, ordered sequence.
///
/// A list holding itself is never freed on its own; see the module docs.
#[derive(Clone, Default)]
pub struct ListRef(Arc<RwLock<Vec<Value>>>);

impl ListRef {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_vec(items: Vec<Value>) -> Self {
		Self(Arc::new(RwLock::new(items)))
	}

	pub fn push(&self, value: impl Into<Value>) {
		self.0.write().push(value.into());
	}

	pub fn get(&self, index: usize) -> Option<Value> {
		self.0.read().get(index).cloned()
	}

	/// Replace the element at `index`. Returns `false` when out of bounds.
	pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
		match self.0.write().get_mut(index) {
			Some(slot) => {
				*slot = value.into();
				true
			}
			None => false,
		}
	}

	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Clone of the current elements (handles are shared, not deep-copied).
	pub fn snapshot(&self) -> Vec<Value> {
		self.0.read().clone()
	}

	pub fn clear(&self) {
		self.0.write().clear();
	}

	pub fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
		self.0.read()
	}

	pub fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
		self.0.write()
	}

	pub fn identity(&self) -> usize {
		address(&self.0)
	}

	pub fn ptr_eq(&self, other: &ListRef) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for ListRef {
	// Never descends into elements: the list may contain itself.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let len = self.0.try_read().map(|items| items.len());
		f.debug_struct("ListRef")
			.field("at", &format_args!("{:#x}", self.identity()))
			.field("len", &len)
			.finish()
	}
}

/// Shared, mutable mapping with string keys that preserves insertion order.
///
/// A map holding itself is never freed on its own; see the module docs.
#[derive(Clone, Default)]
pub struct MapRef(Arc<RwLock<IndexMap<String, Value>>>);

impl MapRef {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
		let map = entries
			.into_iter()
			.map(|(key, value)| (key.into(), value))
			.collect::<IndexMap<_, _>>();
		Self(Arc::new(RwLock::new(map)))
	}

	/// Insert or overwrite. An overwritten key keeps its original position.
	pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.write().insert(key.into(), value.into())
	}

	pub fn get(&self, key: &str) -> Option<Value> {
		self.0.read().get(key).cloned()
	}

	/// Remove an entry, keeping the order of the others.
	pub fn remove(&self, key: &str) -> Option<Value> {
		self.0.write().shift_remove(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}

	pub fn keys(&self) -> Vec<String> {
		self.0.read().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Clone of the current entries in insertion order.
	pub fn snapshot(&self) -> Vec<(String, Value)> {
		self.0
			.read()
			.iter()
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect()
	}

	pub fn clear(&self) {
		self.0.write().clear();
	}

	/// Fetch a required entry, for decode handlers.
	pub fn require(&self, key: &str) -> Result<Value, HandlerError> {
		self.get(key)
			.ok_or_else(|| HandlerError::MissingField(key.to_string()))
	}

	pub fn identity(&self) -> usize {
		address(&self.0)
	}

	pub fn ptr_eq(&self, other: &MapRef) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for MapRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let keys = self
			.0
			.try_read()
			.map(|entries| entries.keys().cloned().collect::<Vec<_>>());
		f.debug_struct("MapRef")
			.field("at", &format_args!("{:#x}", self.identity()))
			.field("keys", &keys)
			.finish()
	}
}

/// Shared handle to a custom object.
///
/// The boxed object can be swapped in place with [`ObjectRef::replace`]; every
/// clone of the handle observes the new contents.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Box<dyn CustomObject>>>);

impl ObjectRef {
	pub fn new<T: CustomObject>(object: T) -> Self {
		Self::from_box(Box::new(object))
	}

	pub fn from_box(object: Box<dyn CustomObject>) -> Self {
		Self(Arc::new(RwLock::new(object)))
	}

	pub fn read(&self) -> RwLockReadGuard<'_, Box<dyn CustomObject>> {
		self.0.read()
	}

	pub fn type_name(&self) -> String {
		self.0.read().type_name().to_string()
	}

	pub fn is<T: CustomObject>(&self) -> bool {
		self.0.read().as_any().is::<T>()
	}

	/// Run `f` against the object if it is a `T`.
	pub fn with<T: CustomObject, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
		let guard = self.0.read();
		guard.as_any().downcast_ref::<T>().map(f)
	}

	/// Run `f` against the object mutably if it is a `T`.
	pub fn with_mut<T: CustomObject, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
		let mut guard = self.0.write();
		guard.as_any_mut().downcast_mut::<T>().map(f)
	}

	/// Swap the contents in place, returning the previous object.
	pub fn replace(&self, object: Box<dyn CustomObject>) -> Box<dyn CustomObject> {
		std::mem::replace(&mut *self.0.write(), object)
	}

	/// Whether the handle still holds a decoder shell.
	pub fn is_pending(&self) -> bool {
		self.is::<PendingObject>()
	}

	pub fn identity(&self) -> usize {
		address(&self.0)
	}

	pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for ObjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let type_name = self.0.try_read().map(|object| object.type_name().to_string());
		f.debug_struct("ObjectRef")
			.field("at", &format_args!("{:#x}", self.identity()))
			.field("type", &type_name)
			.finish()
	}
}
