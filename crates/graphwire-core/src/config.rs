//! Serializer configuration
//!
//! ```toml
//! strict = true
//! indent = 2
//! max_depth = 256
//! ```

use serde::{Deserialize, Serialize};

use crate::context::DEFAULT_MAX_DEPTH;
use crate::error::ConfigError;

/// Options for a [`GraphSerializer`](crate::serializer::GraphSerializer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
	/// Reject objects no descriptor claims instead of encoding their structure.
	pub strict: bool,
	/// Pretty-print with this many spaces; `None` writes compact text.
	pub indent: Option<usize>,
	/// Maximum nesting depth accepted when encoding, parsing and decoding.
	pub max_depth: usize,
}

impl Default for SerializerConfig {
	fn default() -> Self {
		Self {
			strict: true,
			indent: None,
			max_depth: DEFAULT_MAX_DEPTH,
		}
	}
}

impl SerializerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}

	pub fn indent(mut self, indent: Option<usize>) -> Self {
		self.indent = indent;
		self
	}

	pub fn max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	/// Load from TOML text; missing keys keep their defaults.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_depth == 0 {
			return Err(ConfigError::Invalid("max_depth must be greater than zero".to_string()));
		}
		Ok(())
	}
}
