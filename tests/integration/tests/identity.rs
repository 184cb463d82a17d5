//! Sharing and cycles survive a round trip

use graphwire::{GraphSerializer, ListRef, MapRef, Node, Value};
use graphwire_integration_tests::{Person, person_field, round_trip, serializer, unlink};
use rstest::*;

#[rstest]
fn test_shared_reference_preserved(serializer: GraphSerializer) {
	let shared = Value::object(Person::new("ada"));
	let root = Value::map([("x", shared.clone()), ("y", shared)]);

	let decoded = round_trip(&serializer, &root);

	let map = decoded.as_map().unwrap();
	let x = map.get("x").unwrap();
	let y = map.get("y").unwrap();
	assert!(x.same_identity(&y));

	// Mutation through one path is visible through the other.
	x.as_object()
		.unwrap()
		.with_mut(|p: &mut Person| p.name = "changed".into());
	assert_eq!(person_field(&y, |p| p.name.clone()).as_deref(), Some("changed"));
}

#[rstest]
fn test_equal_but_distinct_values_stay_distinct(serializer: GraphSerializer) {
	let root = Value::list([Value::list([Value::Int(1)]), Value::list([Value::Int(1)])]);

	let decoded = round_trip(&serializer, &root);

	let list = decoded.as_list().unwrap();
	assert!(!list.get(0).unwrap().same_identity(&list.get(1).unwrap()));
	assert!(serializer.deep_equal(&root, &decoded));
}

#[rstest]
fn test_self_referencing_map(serializer: GraphSerializer) {
	let map = MapRef::new();
	map.insert("name", "a");
	map.insert("self", Value::Map(map.clone()));
	let root = Value::Map(map.clone());

	let node = serializer.encode_ir(&root).unwrap();
	let decoded = serializer.decode_ir(&node).unwrap();

	let Node::Mapping { id, entries } = &node else {
		panic!("expected a mapping");
	};
	assert_eq!(*id, Some(1));
	assert_eq!(entries[1].1, Node::Reference(1));

	let decoded_self = decoded.as_map().unwrap().get("self").unwrap();
	assert!(decoded_self.same_identity(&decoded));

	map.clear();
	decoded.as_map().unwrap().clear();
}

#[rstest]
fn test_cycle_through_typed_objects(serializer: GraphSerializer) {
	let ada = Value::object(Person::new("ada"));
	let bob = Value::object(Person::new("bob"));
	ada.as_object()
		.unwrap()
		.with_mut(|p: &mut Person| p.friend = bob.clone());
	bob.as_object()
		.unwrap()
		.with_mut(|p: &mut Person| p.friend = ada.clone());

	let decoded = round_trip(&serializer, &ada);

	let decoded_bob = person_field(&decoded, |p| p.friend.clone()).unwrap();
	let back_to_ada = person_field(&decoded_bob, |p| p.friend.clone()).unwrap();
	assert!(back_to_ada.same_identity(&decoded));
	assert_eq!(person_field(&decoded_bob, |p| p.name.clone()).as_deref(), Some("bob"));
	assert!(serializer.deep_equal(&ada, &decoded));

	for value in [&ada, &bob, &decoded, &decoded_bob] {
		unlink(value);
	}
}

#[rstest]
fn test_person_is_own_friend(serializer: GraphSerializer) {
	let narcissus = Value::object(Person::new("narcissus"));
	narcissus
		.as_object()
		.unwrap()
		.with_mut(|p: &mut Person| p.friend = narcissus.clone());

	let decoded = round_trip(&serializer, &narcissus);

	let friend = person_field(&decoded, |p| p.friend.clone()).unwrap();
	assert!(friend.same_identity(&decoded));
	assert!(!decoded.as_object().unwrap().is_pending());

	unlink(&narcissus);
	unlink(&decoded);
}

#[rstest]
fn test_list_containing_itself_twice(serializer: GraphSerializer) {
	let list = ListRef::new();
	list.push(Value::List(list.clone()));
	list.push(Value::List(list.clone()));

	let decoded = round_trip(&serializer, &Value::List(list.clone()));

	let decoded_list = decoded.as_list().unwrap();
	assert_eq!(decoded_list.len(), 2);
	assert!(decoded_list.get(0).unwrap().same_identity(&decoded));
	assert!(decoded_list.get(1).unwrap().same_identity(&decoded));

	list.clear();
	decoded_list.clear();
}

#[rstest]
fn test_ids_follow_depth_first_pre_order(serializer: GraphSerializer) {
	let shared = Value::list([]);
	let root = Value::list([
		Value::map([("a", shared.clone())]),
		Value::list([shared]),
	]);

	let node = serializer.encode_ir(&root).unwrap();

	assert_eq!(node.declared_ids(), vec![1, 2, 3, 4]);
}
