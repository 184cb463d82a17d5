//! # graphwire-core
//!
//! Type-aware serialization of in-memory object graphs.
//!
//! Graphs may share nodes and contain cycles. Custom objects are carried by
//! registering a [`TypeDescriptor`] for them, and the wire text (JSON) keeps
//! NaN, infinities, negative zero, large integers and instants exact.
//!
//! ## Pipeline
//!
//! ```text
//! Value --Encoder--> Node --writer--> wire text --parser--> Node --Decoder--> Value
//! ```
//!
//! - [`encoder`]: depth-first walk assigning ids and emitting references
//! - [`ir`]: the node tree and its JSON form
//! - [`parser`]: wire text back to nodes
//! - [`decoder`]: two-pass rebuild of the graph
//! - [`oracle`]: deep equality for checking round trips
//!
//! ## Example
//!
//! ```
//! use graphwire_core::{GraphSerializer, ListRef, TypeRegistry, Value};
//!
//! let list = ListRef::new();
//! list.push(Value::Float(f64::NAN));
//! list.push(Value::List(list.clone()));
//!
//! let serializer = GraphSerializer::new(TypeRegistry::new());
//! let text = serializer.serialize(&Value::List(list.clone())).unwrap();
//! let decoded = serializer.deserialize(&text).unwrap();
//!
//! let decoded_list = decoded.as_list().unwrap();
//! assert!(decoded_list.get(1).unwrap().same_identity(&decoded));
//! assert!(serializer.deep_equal(&Value::List(list.clone()), &decoded));
//! # list.clear();
//! # decoded_list.clear();
//! ```

pub mod config;
pub mod context;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod ir;
pub mod oracle;
pub mod parser;
pub mod path;
pub mod registry;
pub mod serializer;
pub mod value;

pub use config::SerializerConfig;
pub use context::{DecodingContext, EncodingContext, Resolver};
pub use error::{ConfigError, GraphError, GraphResult, HandlerError, RegistryError};
pub use ir::{Node, NodeId, Primitive};
pub use oracle::Oracle;
pub use path::{PathSegment, ValuePath};
pub use registry::{
	TypeDescriptor, TypeDescriptorBuilder, TypeRegistration, TypeRegistry, global_registry,
	load_registered_types, register_global,
};
pub use serializer::{
	GraphSerializer, Serializer, deep_equal, deserialize, serialize, serialize_with_indent,
};
pub use value::{CustomObject, ListRef, MapRef, ObjectRef, PendingObject, Value};

// Used by `register_type!`.
#[doc(hidden)]
pub use inventory;

/// Install every descriptor submitted with [`register_type!`].
///
/// Equivalent to [`load_registered_types`]; call it once at startup so
/// duplicate tags surface early.
pub fn init() -> Result<usize, RegistryError> {
	load_registered_types()
}

/// Commonly used items.
pub mod prelude {
	pub use crate::{
		CustomObject, GraphError, GraphResult, GraphSerializer, HandlerError, ListRef, MapRef,
		ObjectRef, Resolver, SerializerConfig, TypeDescriptor, TypeRegistry, Value, deep_equal,
		deserialize, register_type, serialize,
	};
}
