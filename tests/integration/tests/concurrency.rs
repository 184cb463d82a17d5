//! Independent graphs serialize concurrently; async hooks run around the walk

use futures::FutureExt;
use graphwire::tables::{Column, Table};
use graphwire::{
	CustomObject, GraphSerializer, HandlerError, ObjectRef, TypeDescriptor, TypeRegistry, Value,
};
use graphwire_integration_tests::{Person, registry, unlink};
use rstest::*;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn sample_graph(n: i64) -> Value {
	let table = Table::from_columns(
		Some(format!("t{n}")),
		[Column::from_ints("x", (0..n).collect::<Vec<_>>())],
	)
	.unwrap();
	let person = Value::object(Person::new(&format!("p{n}")));
	person
		.as_object()
		.unwrap()
		.with_mut(|p: &mut Person| p.friend = person.clone());
	Value::map([
		("table", Value::object(table)),
		("person", person),
		("n", Value::Int(n)),
	])
}

#[rstest]
#[tokio::test]
async fn test_disjoint_graphs_in_parallel(registry: TypeRegistry) {
	let serializer = Arc::new(GraphSerializer::new(registry));

	let handles: Vec<_> = (0..16)
		.map(|n| {
			let serializer = serializer.clone();
			tokio::spawn(async move {
				let graph = sample_graph(n);
				let text = serializer.serialize(&graph).unwrap();
				let decoded = serializer.deserialize(&text).unwrap();
				let equal = serializer.deep_equal(&graph, &decoded);
				for root in [&graph, &decoded] {
					if let Some(person) = root.as_map().and_then(|m| m.get("person")) {
						unlink(&person);
					}
				}
				(n, equal)
			})
		})
		.collect();

	for handle in handles {
		let (n, equal) = handle.await.unwrap();
		assert!(equal, "graph {n} did not survive the round trip");
	}
}

#[rstest]
#[tokio::test]
async fn test_shared_graph_read_concurrently(registry: TypeRegistry) {
	let serializer = Arc::new(GraphSerializer::new(registry));
	let graph = Value::list([Value::Int(1), Value::map([("k", Value::Float(f64::NAN))])]);
	let expected = serializer.serialize(&graph).unwrap();

	let handles: Vec<_> = (0..8)
		.map(|_| {
			let serializer = serializer.clone();
			let graph = graph.clone();
			tokio::spawn(async move { serializer.serialize(&graph).unwrap() })
		})
		.collect();

	for handle in handles {
		assert_eq!(handle.await.unwrap(), expected);
	}
}

/// Row source whose rows are fetched before encoding and counted on load.
#[derive(Debug, Default)]
struct Remote {
	key: String,
	rows: Option<Vec<i64>>,
}

impl CustomObject for Remote {
	fn type_name(&self) -> &str {
		"Remote"
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

fn remote_serializer(fetched: Arc<AtomicUsize>, hydrated: Arc<AtomicUsize>) -> GraphSerializer {
	let mut registry = TypeRegistry::new();
	let descriptor = TypeDescriptor::for_type::<Remote>("Remote", 1)
		.encode_as(|remote: &Remote| {
			let rows = remote
				.rows
				.as_ref()
				.ok_or_else(|| HandlerError::Invalid(format!("{} not fetched", remote.key)))?;
			Ok(Value::map([
				("key", Value::from(remote.key.as_str())),
				("rows", Value::list(rows.iter().map(|r| Value::Int(*r)))),
			]))
		})
		.decode_as(|payload, _| {
			let map = payload.expect_map()?;
			let rows = map
				.require("rows")?
				.expect_list()?
				.snapshot()
				.iter()
				.map(|v| v.as_i64().ok_or_else(|| HandlerError::mismatch("int", v)))
				.collect::<Result<Vec<_>, _>>()?;
			Ok(Remote {
				key: map.require("key")?.expect_str()?.to_string(),
				rows: Some(rows),
			})
		})
		.prepare(move |object: ObjectRef| {
			let fetched = fetched.clone();
			async move {
				tokio::time::sleep(Duration::from_millis(5)).await;
				object.with_mut(|remote: &mut Remote| {
					let len = remote.key.len() as i64;
					remote.rows = Some((0..len).collect());
				});
				fetched.fetch_add(1, Ordering::SeqCst);
				Ok::<(), HandlerError>(())
			}
			.boxed()
		})
		.hydrate(move |_| {
			let hydrated = hydrated.clone();
			async move {
				hydrated.fetch_add(1, Ordering::SeqCst);
				Ok::<(), HandlerError>(())
			}
			.boxed()
		})
		.build()
		.unwrap();
	registry.register(descriptor).unwrap();
	GraphSerializer::new(registry)
}

fn remote(key: &str) -> Value {
	Value::object(Remote {
		key: key.to_string(),
		rows: None,
	})
}

#[rstest]
#[tokio::test]
async fn test_prepare_runs_once_per_object() {
	let fetched = Arc::new(AtomicUsize::new(0));
	let hydrated = Arc::new(AtomicUsize::new(0));
	let serializer = remote_serializer(fetched.clone(), hydrated.clone());
	let shared = remote("abc");
	let root = Value::map([
		("first", shared.clone()),
		("again", shared),
		("other", Value::list([remote("de")])),
	]);

	let text = serializer.serialize_async(&root).await.unwrap();
	let decoded = serializer.deserialize_async(&text).await.unwrap();

	assert_eq!(fetched.load(Ordering::SeqCst), 2);
	assert_eq!(hydrated.load(Ordering::SeqCst), 2);
	assert!(serializer.deep_equal(&root, &decoded));
}

#[rstest]
#[tokio::test]
async fn test_encode_without_prepare_fails() {
	let serializer = remote_serializer(Arc::default(), Arc::default());

	let err = serializer.serialize(&remote("abc")).unwrap_err();

	assert!(err.to_string().contains("abc not fetched"));
}

#[rstest]
#[tokio::test]
async fn test_hooked_graphs_in_parallel() {
	let fetched = Arc::new(AtomicUsize::new(0));
	let serializer = Arc::new(remote_serializer(fetched.clone(), Arc::default()));

	let handles: Vec<_> = (1..=6)
		.map(|n| {
			let serializer = serializer.clone();
			tokio::spawn(async move {
				let root = Value::list([remote(&"x".repeat(n)), Value::Int(n as i64)]);
				let text = serializer.serialize_async(&root).await.unwrap();
				let decoded = serializer.deserialize_async(&text).await.unwrap();
				serializer.deep_equal(&root, &decoded)
			})
		})
		.collect();

	for handle in handles {
		assert!(handle.await.unwrap());
	}
	assert_eq!(fetched.load(Ordering::SeqCst), 6);
}
