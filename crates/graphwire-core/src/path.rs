//! Location of a node relative to the root of the value graph

use std::fmt;

/// One step from a parent node to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
	/// Mapping entry
	Key(String),
	/// Sequence element
	Index(usize),
	/// Descent into the payload of a typed node
	Payload(String),
}

/// Sequence of keys/indices from the root, rendered as `$.columns[1]<Table>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuePath {
	segments: Vec<PathSegment>,
}

impl ValuePath {
	pub fn root() -> Self {
		Self::default()
	}

	pub fn push(&mut self, segment: PathSegment) {
		self.segments.push(segment);
	}

	pub fn pop(&mut self) -> Option<PathSegment> {
		self.segments.pop()
	}

	pub fn segments(&self) -> &[PathSegment] {
		&self.segments
	}

	pub fn depth(&self) -> usize {
		self.segments.len()
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}
}

impl fmt::Display for ValuePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "$")?;
		for segment in &self.segments {
			match segment {
				PathSegment::Key(key) => write!(f, ".{}", key)?,
				PathSegment::Index(index) => write!(f, "[{}]", index)?,
				PathSegment::Payload(tag) => write!(f, "<{}>", tag)?,
			}
		}
		Ok(())
	}
}
