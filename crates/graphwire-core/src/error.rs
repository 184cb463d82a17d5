//! Error types for graph encoding, decoding and type registration.

use thiserror::Error;

use crate::path::ValuePath;
use crate::value::Value;

/// Result type for encode/decode operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while encoding or decoding a value graph.
///
/// Every variant produced during traversal carries the path from the root to
/// the offending node.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError {
	/// Encode-time: no descriptor matches and no structural fallback applies.
	#[error("no type descriptor registered for '{type_name}' at {path}")]
	UnregisteredType {
		/// Location of the object.
		path: ValuePath,
		/// Type name reported by the object.
		type_name: String,
	},

	/// Decode-time: typed node tag is not registered.
	#[error("unknown type tag '{tag}' at {path}")]
	UnknownTypeTag {
		/// Location of the typed node.
		path: ValuePath,
		/// Tag found on the wire.
		tag: String,
	},

	/// Decode-time: wire version outside the descriptor's supported range.
	#[error("type '{tag}' version {found} at {path} is not supported (supported {min}..={max})")]
	VersionMismatch {
		/// Location of the typed node.
		path: ValuePath,
		/// Type tag.
		tag: String,
		/// Version found on the wire.
		found: u32,
		/// Oldest version the descriptor reads.
		min: u32,
		/// Current descriptor version.
		max: u32,
	},

	/// Decode-time: reference to an id that no node declares.
	#[error("reference to undeclared node id {id} at {path}")]
	MalformedReference {
		/// Location of the reference.
		path: ValuePath,
		/// Dangling id.
		id: u64,
	},

	/// Decode-time: a handler received a payload of the wrong shape.
	#[error("expected {expected} but found {found} at {path}")]
	StructuralTypeMismatch {
		/// Location of the payload part.
		path: ValuePath,
		/// Shape the handler wanted.
		expected: String,
		/// Shape it received.
		found: String,
	},

	/// Graph nesting exceeded the configured limit.
	#[error("maximum depth {max_depth} exceeded at {path}")]
	DepthLimitExceeded {
		/// Location where the limit was hit.
		path: ValuePath,
		/// Configured limit.
		max_depth: usize,
	},

	/// Wire text is valid JSON but does not follow the node grammar.
	#[error("malformed wire data at {path}: {message}")]
	MalformedWire {
		/// Location inside the wire tree.
		path: ValuePath,
		/// What is wrong.
		message: String,
	},

	/// A type handler failed for a reason other than shape.
	#[error("handler for '{tag}' failed at {path}: {message}")]
	Handler {
		/// Location of the typed node.
		path: ValuePath,
		/// Type tag.
		tag: String,
		/// Handler message.
		message: String,
	},

	/// Wire text is not valid JSON, or could not be written.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Registry lookup failure outside traversal.
	#[error(transparent)]
	Registry(#[from] RegistryError),
}

impl GraphError {
	/// Path of the offending node, if the error arose during traversal.
	pub fn path(&self) -> Option<&ValuePath> {
		match self {
			GraphError::UnregisteredType { path, .. }
			| GraphError::UnknownTypeTag { path, .. }
			| GraphError::VersionMismatch { path, .. }
			| GraphError::MalformedReference { path, .. }
			| GraphError::StructuralTypeMismatch { path, .. }
			| GraphError::DepthLimitExceeded { path, .. }
			| GraphError::MalformedWire { path, .. }
			| GraphError::Handler { path, .. } => Some(path),
			GraphError::Json(_) | GraphError::Registry(_) => None,
		}
	}

	/// Attach a path and tag to a handler failure.
	pub(crate) fn from_handler(err: HandlerError, path: &ValuePath, tag: &str) -> Self {
		match err {
			HandlerError::Mismatch { expected, found } => GraphError::StructuralTypeMismatch {
				path: path.clone(),
				expected,
				found,
			},
			HandlerError::MissingField(field) => GraphError::StructuralTypeMismatch {
				path: path.clone(),
				expected: format!("map with field '{}'", field),
				found: "map without it".to_string(),
			},
			HandlerError::Invalid(message) => GraphError::Handler {
				path: path.clone(),
				tag: tag.to_string(),
				message,
			},
		}
	}
}

/// Registration-time and lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
	/// Tag already bound to a different handler triple.
	#[error("type tag already registered: {0}")]
	DuplicateTag(String),

	/// Tag not present in the registry.
	#[error("unknown type tag: {0}")]
	UnknownTypeTag(String),

	/// Descriptor failed validation.
	#[error("invalid descriptor for '{tag}': {message}")]
	InvalidDescriptor {
		/// Type tag.
		tag: String,
		/// Reason.
		message: String,
	},
}

/// Error returned by a type's encode/decode handler.
///
/// The engine turns it into a [`GraphError`] carrying the current path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandlerError {
	/// Payload part had the wrong shape.
	#[error("expected {expected}, found {found}")]
	Mismatch {
		/// Shape the handler wanted.
		expected: String,
		/// Shape it received.
		found: String,
	},

	/// Required mapping entry missing from the payload.
	#[error("missing field '{0}'")]
	MissingField(String),

	/// Any other handler failure.
	#[error("{0}")]
	Invalid(String),
}

impl HandlerError {
	/// Mismatch between the expected shape and the value actually found.
	pub fn mismatch(expected: impl Into<String>, found: &Value) -> Self {
		HandlerError::Mismatch {
			expected: expected.into(),
			found: found.kind_name().to_string(),
		}
	}
}

/// Configuration loading errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// TOML parsing error.
	#[error("TOML parse error: {0}")]
	TomlParse(#[from] toml::de::Error),

	/// Value out of range.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}
