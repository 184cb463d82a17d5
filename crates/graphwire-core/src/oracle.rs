//! Type-aware deep equality
//!
//! Used to check round trips: two graphs are equal when they have the same
//! shape and contents, regardless of which allocations back them.

use std::collections::HashSet;

use crate::registry::TypeRegistry;
use crate::value::{ObjectRef, Value};

/// Deep comparison against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Oracle<'r> {
	registry: &'r TypeRegistry,
}

impl<'r> Oracle<'r> {
	pub fn new(registry: &'r TypeRegistry) -> Self {
		Self { registry }
	}

	/// Whether `a` and `b` are deeply equal.
	///
	/// NaN equals NaN, integers never equal floats, and sequences and
	/// mappings compare in order. Cycles terminate: a pair of handles met
	/// again while already being compared is taken as equal.
	pub fn deep_equal(&self, a: &Value, b: &Value) -> bool {
		Comparison {
			registry: self.registry,
			visited: HashSet::new(),
			pinned: Vec::new(),
		}
		.compare(a, b)
	}
}

struct Comparison<'r> {
	registry: &'r TypeRegistry,
	visited: HashSet<(usize, usize)>,
	/// Payloads produced during the comparison; kept alive so their
	/// addresses stay unique while they are keys in `visited`.
	pinned: Vec<Value>,
}

impl Comparison<'_> {
	/// Record the pair; `false` if it was already being compared.
	fn enter(&mut self, a: usize, b: usize) -> bool {
		self.visited.insert((a, b))
	}

	fn compare(&mut self, a: &Value, b: &Value) -> bool {
		if a.same_identity(b) {
			return true;
		}

		match (a, b) {
			(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
			(Value::Bool(x), Value::Bool(y)) => x == y,
			(Value::Int(x), Value::Int(y)) => x == y,
			(Value::Float(x), Value::Float(y)) => floats_equal(*x, *y),
			(Value::String(x), Value::String(y)) => x == y,
			(Value::DateTime(x), Value::DateTime(y)) => x == y,
			(Value::List(x), Value::List(y)) => {
				if !self.enter(x.identity(), y.identity()) {
					return true;
				}
				let xs = x.snapshot();
				let ys = y.snapshot();
				xs.len() == ys.len() && xs.iter().zip(&ys).all(|(x, y)| self.compare(x, y))
			}
			(Value::Map(x), Value::Map(y)) => {
				if !self.enter(x.identity(), y.identity()) {
					return true;
				}
				let xs = x.snapshot();
				let ys = y.snapshot();
				xs.len() == ys.len()
					&& xs
						.iter()
						.zip(&ys)
						.all(|((kx, vx), (ky, vy))| kx == ky && self.compare(vx, vy))
			}
			(Value::Object(x), Value::Object(y)) => {
				if !self.enter(x.identity(), y.identity()) {
					return true;
				}
				self.compare_objects(a, x, b, y)
			}
			_ => false,
		}
	}

	fn compare_objects(&mut self, a: &Value, x: &ObjectRef, b: &Value, y: &ObjectRef) -> bool {
		let registry = self.registry;
		match (registry.resolve_for_encode(a), registry.resolve_for_encode(b)) {
			(Some(da), Some(db)) => {
				if da.tag() != db.tag() {
					return false;
				}
				let (gx, gy) = (x.read(), y.read());
				if let Some(equal) = da.equals(&**gx, &**gy) {
					return equal;
				}
				let payloads = (da.encode(&**gx), da.encode(&**gy));
				drop((gx, gy));
				match payloads {
					(Ok(px), Ok(py)) => {
						self.pinned.push(px.clone());
						self.pinned.push(py.clone());
						self.compare(&px, &py)
					}
					_ => false,
				}
			}
			(None, None) => {
				let structures = (x.read().structure(), y.read().structure());
				match structures {
					(Some(sx), Some(sy)) => {
						self.pinned.push(sx.clone());
						self.pinned.push(sy.clone());
						self.compare(&sx, &sy)
					}
					_ => false,
				}
			}
			_ => false,
		}
	}
}

/// IEEE equality except that NaN equals NaN.
fn floats_equal(a: f64, b: f64) -> bool {
	a == b || (a.is_nan() && b.is_nan())
}
