//! Failure modes surface as typed errors carrying the offending path

use graphwire::tables::Table;
use graphwire::{
	ConfigError, GraphError, GraphSerializer, RegistryError, SerializerConfig, TypeRegistry, Value,
};
use graphwire_integration_tests::{
	Person, Untracked, letters_table, person_descriptor, registry, serializer,
};
use rstest::*;

fn nested_lists(depth: usize) -> Value {
	let mut value = Value::list([]);
	for _ in 0..depth {
		value = Value::list([value]);
	}
	value
}

#[rstest]
fn test_unregistered_object_names_path(serializer: GraphSerializer) {
	let root = Value::map([(
		"rows",
		Value::list([Value::Int(1), Value::object(Untracked { fields: None })]),
	)]);

	let err = serializer.serialize(&root).unwrap_err();

	match &err {
		GraphError::UnregisteredType { path, type_name } => {
			assert_eq!(type_name, "Untracked");
			assert_eq!(path.to_string(), "$.rows[1]");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[rstest]
fn test_strict_mode_ignores_structure(serializer: GraphSerializer) {
	let root = Value::object(Untracked {
		fields: Some(Value::map([("x", Value::Int(1))])),
	});

	assert!(matches!(
		serializer.serialize(&root),
		Err(GraphError::UnregisteredType { .. })
	));
}

#[rstest]
fn test_dangling_reference(serializer: GraphSerializer) {
	let err = serializer.deserialize(r#"{"k":"ref","id":99}"#).unwrap_err();

	assert!(matches!(err, GraphError::MalformedReference { id: 99, .. }));
}

#[rstest]
fn test_dangling_reference_inside_mapping(serializer: GraphSerializer) {
	let text = r#"{"k":"map","id":1,"v":[["ok",{"k":"int","v":1}],["bad",{"k":"ref","id":7}]]}"#;

	let err = serializer.deserialize(text).unwrap_err();

	assert_eq!(err.path().map(ToString::to_string), Some("$.bad".to_string()));
}

#[rstest]
fn test_unknown_type_tag(serializer: GraphSerializer) {
	let text = r#"{"k":"seq","id":1,"v":[{"k":"typed","tag":"Ghost","ver":1,"id":2,"v":{"k":"null"}}]}"#;

	let err = serializer.deserialize(text).unwrap_err();

	match &err {
		GraphError::UnknownTypeTag { path, tag } => {
			assert_eq!(tag, "Ghost");
			assert_eq!(path.to_string(), "$[0]");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[rstest]
#[case(0)]
#[case(3)]
fn test_person_version_out_of_range(serializer: GraphSerializer, #[case] version: u32) {
	let text = format!(
		r#"{{"k":"typed","tag":"Person","ver":{version},"id":1,"v":{{"k":"map","id":2,"v":[]}}}}"#
	);

	let err = serializer.deserialize(&text).unwrap_err();

	match err {
		// Version zero never reaches the registry.
		GraphError::MalformedWire { .. } => assert_eq!(version, 0),
		GraphError::VersionMismatch { tag, found, min, max, .. } => {
			assert_eq!(tag, "Person");
			assert_eq!((found, min, max), (3, 1, 2));
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[rstest]
fn test_payload_of_wrong_shape(serializer: GraphSerializer) {
	let text = r#"{"k":"typed","tag":"Person","ver":2,"id":1,"v":{"k":"seq","id":2,"v":[]}}"#;

	let err = serializer.deserialize(text).unwrap_err();

	match &err {
		GraphError::StructuralTypeMismatch { path, expected, found } => {
			assert_eq!(path.to_string(), "$<Person>");
			assert_eq!(expected, "map");
			assert_eq!(found, "list");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[rstest]
fn test_payload_missing_field(serializer: GraphSerializer) {
	let text = r#"{"k":"typed","tag":"Person","ver":2,"id":1,"v":{"k":"map","id":2,"v":[["name",{"k":"str","v":"x"}]]}}"#;

	assert!(matches!(
		serializer.deserialize(text),
		Err(GraphError::StructuralTypeMismatch { .. })
	));
}

#[rstest]
fn test_encode_depth_limit(registry: TypeRegistry) {
	let serializer =
		GraphSerializer::new(registry).with_config(SerializerConfig::new().max_depth(4));

	assert!(serializer.serialize(&nested_lists(3)).is_ok());
	let err = serializer.serialize(&nested_lists(10)).unwrap_err();

	assert!(matches!(err, GraphError::DepthLimitExceeded { max_depth: 4, .. }));
}

#[rstest]
fn test_decode_depth_limit(serializer: GraphSerializer, registry: TypeRegistry) {
	let text = serializer.serialize(&nested_lists(50)).unwrap();
	let shallow =
		GraphSerializer::new(registry).with_config(SerializerConfig::new().max_depth(10));

	let err = shallow.deserialize(&text).unwrap_err();

	assert!(matches!(err, GraphError::DepthLimitExceeded { max_depth: 10, .. }));
}

#[rstest]
fn test_deep_graph_within_default_limit(serializer: GraphSerializer) {
	let value = nested_lists(400);

	let text = serializer.serialize(&value).unwrap();
	let decoded = serializer.deserialize(&text).unwrap();

	assert!(serializer.deep_equal(&value, &decoded));
}

#[rstest]
#[case("")]
#[case("{\"k\":")]
#[case("not json")]
fn test_invalid_json(serializer: GraphSerializer, #[case] text: &str) {
	assert!(matches!(serializer.deserialize(text), Err(GraphError::Json(_))));
}

#[rstest]
#[case(r#"{"k":"map","id":1,"v":[["a",{"k":"null"}],["a",{"k":"null"}]]}"#)]
#[case(r#"{"k":"seq","id":1,"v":[{"k":"seq","id":1,"v":[]}]}"#)]
#[case(r#"{"k":"wat"}"#)]
#[case(r#"{"k":"int","v":1.5}"#)]
fn test_malformed_wire(serializer: GraphSerializer, #[case] text: &str) {
	assert!(matches!(
		serializer.deserialize(text),
		Err(GraphError::MalformedWire { .. })
	));
}

#[rstest]
fn test_conflicting_registration_rejected(mut registry: TypeRegistry) {
	let err = registry.register(person_descriptor().unwrap()).unwrap_err();

	assert_eq!(err, RegistryError::DuplicateTag("Person".to_string()));
	assert_eq!(registry.len(), 3);
}

#[rstest]
fn test_failed_decode_leaves_no_partial_graph(serializer: GraphSerializer, letters_table: Table) {
	let good = serializer
		.serialize(&Value::list([
			Value::object(letters_table),
			Value::object(Person::new("ada")),
		]))
		.unwrap();
	let broken = good.replace("\"Person\"", "\"Ghost\"");

	assert!(serializer.deserialize(&broken).is_err());
	assert!(serializer.deserialize(&good).is_ok());
}

#[rstest]
fn test_config_from_toml() {
	let config = SerializerConfig::from_toml_str("strict = false\nindent = 2\nmax_depth = 64\n")
		.unwrap();

	assert!(!config.strict);
	assert_eq!(config.indent, Some(2));
	assert_eq!(config.max_depth, 64);
}

#[rstest]
#[case("max_depth = 0", true)]
#[case("strict = \"yes\"", false)]
fn test_config_rejected(#[case] text: &str, #[case] out_of_range: bool) {
	let err = SerializerConfig::from_toml_str(text).unwrap_err();

	if out_of_range {
		assert!(matches!(err, ConfigError::Invalid(_)));
	} else {
		assert!(matches!(err, ConfigError::TomlParse(_)));
	}
}
