//! Type descriptor registry
//!
//! A [`TypeRegistry`] maps type tags to the handlers that encode and decode a
//! custom object. It is a plain lookup table: traversal lives in the encoder
//! and decoder.
//!
//! ## Process-wide registry
//!
//! Type owners either call [`register_global`] at startup or submit a
//! descriptor factory at compile time with [`register_type!`]:
//!
//! ```ignore
//! fn descriptor() -> Result<TypeDescriptor, RegistryError> {
//!     TypeDescriptor::for_type::<Matrix>("Matrix", 1)
//!         .encode_as(|m: &Matrix| Ok(m.to_value()))
//!         .decode_as(|payload, _| Matrix::from_value(&payload))
//!         .build()
//! }
//!
//! graphwire_core::register_type!(descriptor);
//! ```
//!
//! [`load_registered_types`] installs every submitted descriptor once. Each
//! call to [`global_registry`] returns an immutable snapshot, so encode and
//! decode never hold a lock while traversing.

use futures::future::BoxFuture;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Resolver;
use crate::error::{HandlerError, RegistryError};
use crate::value::{CustomObject, ObjectRef, PendingObject, Value};

/// Selects the descriptor used to encode an object.
pub type MatchFn = Arc<dyn Fn(&dyn CustomObject) -> bool + Send + Sync>;
/// Converts an object into its payload.
pub type EncodeFn = Arc<dyn Fn(&dyn CustomObject) -> Result<Value, HandlerError> + Send + Sync>;
/// Rebuilds an object from its decoded payload.
pub type DecodeFn =
	Arc<dyn Fn(Value, &Resolver<'_>) -> Result<Box<dyn CustomObject>, HandlerError> + Send + Sync>;
/// Creates the empty stand-in allocated before the payload is decoded.
pub type ShellFn = Arc<dyn Fn() -> Box<dyn CustomObject> + Send + Sync>;
/// Type-specific equality used by the oracle.
pub type EqualsFn = Arc<dyn Fn(&dyn CustomObject, &dyn CustomObject) -> bool + Send + Sync>;
/// Suspending hook run around the synchronous walk (prefetch, hydration).
pub type HookFn =
	Arc<dyn Fn(ObjectRef) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Encode/decode contract for one custom type.
#[derive(Clone)]
pub struct TypeDescriptor {
	tag: String,
	version: u32,
	min_version: u32,
	matches: MatchFn,
	encode: EncodeFn,
	decode: DecodeFn,
	shell: Option<ShellFn>,
	equals: Option<EqualsFn>,
	prepare: Option<HookFn>,
	hydrate: Option<HookFn>,
}

impl TypeDescriptor {
	/// Start a descriptor whose predicate, encoder and decoder are supplied manually.
	pub fn builder(tag: impl Into<String>, version: u32) -> TypeDescriptorBuilder {
		TypeDescriptorBuilder::new(tag.into(), version)
	}

	/// Start a descriptor matching every object whose concrete type is `T`.
	pub fn for_type<T: CustomObject>(tag: impl Into<String>, version: u32) -> TypeDescriptorBuilder {
		Self::builder(tag, version).matches(|object| object.as_any().is::<T>())
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	/// Version written on encode.
	pub fn version(&self) -> u32 {
		self.version
	}

	/// Oldest wire version the decoder still accepts.
	pub fn min_version(&self) -> u32 {
		self.min_version
	}

	pub fn supports(&self, version: u32) -> bool {
		(self.min_version..=self.version).contains(&version)
	}

	pub fn matches(&self, object: &dyn CustomObject) -> bool {
		(self.matches)(object)
	}

	pub fn encode(&self, object: &dyn CustomObject) -> Result<Value, HandlerError> {
		(self.encode)(object)
	}

	pub fn decode(
		&self,
		payload: Value,
		resolver: &Resolver<'_>,
	) -> Result<Box<dyn CustomObject>, HandlerError> {
		(self.decode)(payload, resolver)
	}

	/// Placeholder object for pass one of decoding.
	pub fn shell(&self) -> Box<dyn CustomObject> {
		match &self.shell {
			Some(shell) => shell(),
			None => Box::new(PendingObject::new(self.tag.clone())),
		}
	}

	/// Type-specific comparison, if one was registered.
	pub fn equals(&self, a: &dyn CustomObject, b: &dyn CustomObject) -> Option<bool> {
		self.equals.as_ref().map(|equals| equals(a, b))
	}

	pub fn prepare_hook(&self) -> Option<&HookFn> {
		self.prepare.as_ref()
	}

	pub fn hydrate_hook(&self) -> Option<&HookFn> {
		self.hydrate.as_ref()
	}

	/// Whether both descriptors share the same handler triple.
	pub fn same_handlers(&self, other: &TypeDescriptor) -> bool {
		Arc::ptr_eq(&self.matches, &other.matches)
			&& Arc::ptr_eq(&self.encode, &other.encode)
			&& Arc::ptr_eq(&self.decode, &other.decode)
	}
}

impl fmt::Debug for TypeDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypeDescriptor")
			.field("tag", &self.tag)
			.field("version", &self.version)
			.field("min_version", &self.min_version)
			.field("has_equals", &self.equals.is_some())
			.field("has_prepare", &self.prepare.is_some())
			.field("has_hydrate", &self.hydrate.is_some())
			.finish()
	}
}

/// Builder for [`TypeDescriptor`].
pub struct TypeDescriptorBuilder {
	tag: String,
	version: u32,
	min_version: Option<u32>,
	matches: Option<MatchFn>,
	encode: Option<EncodeFn>,
	decode: Option<DecodeFn>,
	shell: Option<ShellFn>,
	equals: Option<EqualsFn>,
	prepare: Option<HookFn>,
	hydrate: Option<HookFn>,
}

impl TypeDescriptorBuilder {
	fn new(tag: String, version: u32) -> Self {
		Self {
			tag,
			version,
			min_version: None,
			matches: None,
			encode: None,
			decode: None,
			shell: None,
			equals: None,
			prepare: None,
			hydrate: None,
		}
	}

	/// Oldest wire version this descriptor can still decode (defaults to `version`).
	pub fn min_version(mut self, min_version: u32) -> Self {
		self.min_version = Some(min_version);
		self
	}

	pub fn matches(
		mut self,
		predicate: impl Fn(&dyn CustomObject) -> bool + Send + Sync + 'static,
	) -> Self {
		self.matches = Some(Arc::new(predicate));
		self
	}

	pub fn encode_with(
		mut self,
		encode: impl Fn(&dyn CustomObject) -> Result<Value, HandlerError> + Send + Sync + 'static,
	) -> Self {
		self.encode = Some(Arc::new(encode));
		self
	}

	/// Typed encoder; the object is downcast to `T` before `encode` runs.
	pub fn encode_as<T: CustomObject>(
		self,
		encode: impl Fn(&T) -> Result<Value, HandlerError> + Send + Sync + 'static,
	) -> Self {
		let tag = self.tag.clone();
		self.encode_with(move |object| match object.as_any().downcast_ref::<T>() {
			Some(typed) => encode(typed),
			None => Err(HandlerError::Invalid(format!(
				"descriptor '{}' cannot encode a '{}'",
				tag,
				object.type_name()
			))),
		})
	}

	pub fn decode_with(
		mut self,
		decode: impl Fn(Value, &Resolver<'_>) -> Result<Box<dyn CustomObject>, HandlerError>
		+ Send
		+ Sync
		+ 'static,
	) -> Self {
		self.decode = Some(Arc::new(decode));
		self
	}

	/// Typed decoder producing a `T`.
	pub fn decode_as<T: CustomObject>(
		self,
		decode: impl Fn(Value, &Resolver<'_>) -> Result<T, HandlerError> + Send + Sync + 'static,
	) -> Self {
		self.decode_with(move |payload, resolver| {
			decode(payload, resolver).map(|typed| Box::new(typed) as Box<dyn CustomObject>)
		})
	}

	pub fn shell(
		mut self,
		shell: impl Fn() -> Box<dyn CustomObject> + Send + Sync + 'static,
	) -> Self {
		self.shell = Some(Arc::new(shell));
		self
	}

	/// Typed comparator for the equality oracle.
	pub fn equals_as<T: CustomObject>(
		mut self,
		equals: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
	) -> Self {
		self.equals = Some(Arc::new(move |a: &dyn CustomObject, b: &dyn CustomObject| {
			match (
				a.as_any().downcast_ref::<T>(),
				b.as_any().downcast_ref::<T>(),
			) {
				(Some(a), Some(b)) => equals(a, b),
				_ => false,
			}
		}));
		self
	}

	/// Hook awaited before the object is encoded by the async entry points.
	pub fn prepare(
		mut self,
		hook: impl Fn(ObjectRef) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync + 'static,
	) -> Self {
		self.prepare = Some(Arc::new(hook));
		self
	}

	/// Hook awaited after the object is decoded by the async entry points.
	pub fn hydrate(
		mut self,
		hook: impl Fn(ObjectRef) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync + 'static,
	) -> Self {
		self.hydrate = Some(Arc::new(hook));
		self
	}

	pub fn build(self) -> Result<TypeDescriptor, RegistryError> {
		let invalid = |message: &str| RegistryError::InvalidDescriptor {
			tag: self.tag.clone(),
			message: message.to_string(),
		};

		if self.tag.is_empty() {
			return Err(invalid("tag must not be empty"));
		}
		if self.version == 0 {
			return Err(invalid("version must be at least 1"));
		}
		let min_version = self.min_version.unwrap_or(self.version);
		if min_version == 0 || min_version > self.version {
			return Err(invalid("min_version must be within 1..=version"));
		}
		let matches = self.matches.clone().ok_or_else(|| invalid("missing match predicate"))?;
		let encode = self.encode.clone().ok_or_else(|| invalid("missing encode handler"))?;
		let decode = self.decode.clone().ok_or_else(|| invalid("missing decode handler"))?;

		Ok(TypeDescriptor {
			tag: self.tag,
			version: self.version,
			min_version,
			matches,
			encode,
			decode,
			shell: self.shell,
			equals: self.equals,
			prepare: self.prepare,
			hydrate: self.hydrate,
		})
	}
}

/// Lookup table from type tag to descriptor.
#[derive(Clone, Default, Debug)]
pub struct TypeRegistry {
	descriptors: Vec<Arc<TypeDescriptor>>,
	by_tag: HashMap<String, usize>,
}

impl TypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bind a descriptor to its tag.
	///
	/// Registering a descriptor that shares its handlers with the one already
	/// bound is a no-op; any other descriptor for a bound tag is rejected.
	pub fn register(&mut self, descriptor: impl Into<Arc<TypeDescriptor>>) -> Result<(), RegistryError> {
		let descriptor = descriptor.into();
		if let Some(&index) = self.by_tag.get(descriptor.tag()) {
			if self.descriptors[index].same_handlers(&descriptor) {
				return Ok(());
			}
			return Err(RegistryError::DuplicateTag(descriptor.tag().to_string()));
		}

		tracing::debug!(tag = descriptor.tag(), version = descriptor.version(), "registered type");
		self.by_tag
			.insert(descriptor.tag().to_string(), self.descriptors.len());
		self.descriptors.push(descriptor);
		Ok(())
	}

	/// First descriptor, in registration order, matching the value.
	///
	/// Only custom objects are dispatched; primitives and plain containers are
	/// always encoded structurally.
	pub fn resolve_for_encode(&self, value: &Value) -> Option<&Arc<TypeDescriptor>> {
		let Value::Object(object) = value else {
			return None;
		};
		let guard = object.read();
		self.descriptors
			.iter()
			.find(|descriptor| descriptor.matches(&**guard))
	}

	pub fn resolve_for_decode(&self, tag: &str) -> Result<&Arc<TypeDescriptor>, RegistryError> {
		self.by_tag
			.get(tag)
			.map(|&index| &self.descriptors[index])
			.ok_or_else(|| RegistryError::UnknownTypeTag(tag.to_string()))
	}

	pub fn contains(&self, tag: &str) -> bool {
		self.by_tag.contains_key(tag)
	}

	/// Descriptors in registration order.
	pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
		self.descriptors.iter()
	}

	/// Registered tags in registration order.
	pub fn tags(&self) -> Vec<&str> {
		self.descriptors.iter().map(|d| d.tag()).collect()
	}

	pub fn len(&self) -> usize {
		self.descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors.is_empty()
	}
}

/// Compile-time descriptor submission collected by `inventory`.
pub struct TypeRegistration {
	factory: fn() -> Result<TypeDescriptor, RegistryError>,
}

impl TypeRegistration {
	pub const fn new(factory: fn() -> Result<TypeDescriptor, RegistryError>) -> Self {
		Self { factory }
	}

	pub fn build(&self) -> Result<TypeDescriptor, RegistryError> {
		(self.factory)()
	}
}

inventory::collect!(TypeRegistration);

/// Submit a descriptor factory for [`load_registered_types`].
///
/// The argument is a `fn() -> Result<TypeDescriptor, RegistryError>`.
#[macro_export]
macro_rules! register_type {
	($factory:expr) => {
		$crate::inventory::submit! {
			$crate::registry::TypeRegistration::new($factory)
		}
	};
}

static GLOBAL_REGISTRY: Lazy<RwLock<Arc<TypeRegistry>>> =
	Lazy::new(|| RwLock::new(Arc::new(TypeRegistry::new())));

static REGISTERED_TYPES: OnceCell<Result<usize, RegistryError>> = OnceCell::new();

/// Snapshot of the process-wide registry.
pub fn global_registry() -> Arc<TypeRegistry> {
	GLOBAL_REGISTRY.read().clone()
}

/// Add a descriptor to the process-wide registry.
///
/// Snapshots taken earlier are unaffected.
pub fn register_global(descriptor: impl Into<Arc<TypeDescriptor>>) -> Result<(), RegistryError> {
	let mut guard = GLOBAL_REGISTRY.write();
	let mut next = TypeRegistry::clone(&guard);
	next.register(descriptor)?;
	*guard = Arc::new(next);
	Ok(())
}

/// Install every descriptor submitted with [`register_type!`].
///
/// Runs once per process; later calls return the first outcome. A duplicate
/// tag is reported here so startup fails instead of dispatching ambiguously.
pub fn load_registered_types() -> Result<usize, RegistryError> {
	REGISTERED_TYPES
		.get_or_init(|| {
			let mut loaded = 0;
			for registration in inventory::iter::<TypeRegistration> {
				register_global(registration.build()?)?;
				loaded += 1;
			}
			tracing::info!("Loaded {} registered types", loaded);
			Ok(loaded)
		})
		.clone()
}
