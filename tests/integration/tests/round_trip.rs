//! Round trip fidelity through the wire text

use chrono::{DateTime, TimeZone, Utc};
use graphwire::tables::{Column, ColumnData, Table};
use graphwire::{GraphSerializer, Value};
use graphwire_integration_tests::{
	Person, Workbook, instant, letters_table, nested_value, person_field, round_trip, serializer,
};
use proptest::prelude::*;
use rstest::*;

#[rstest]
fn test_canonical_table_scenario(serializer: GraphSerializer, letters_table: Table) {
	let root = Value::map([("a", Value::object(letters_table))]);

	let decoded = round_trip(&serializer, &root);

	let table = decoded
		.as_map()
		.and_then(|map| map.get("a"))
		.and_then(|a| a.as_object().and_then(|o| o.with(|t: &Table| t.clone())))
		.unwrap();
	assert_eq!(table.column_names(), vec!["a", "b"]);
	assert_eq!(
		table.column("a").map(Column::data),
		Some(&ColumnData::String(vec!["a".to_string(), "b".to_string()]))
	);
	assert_eq!(
		table.column("b").map(Column::data),
		Some(&ColumnData::Double(vec![1.0, 2.2]))
	);
	assert!(serializer.deep_equal(&root, &decoded));
}

#[rstest]
fn test_global_entry_points_know_registered_types(letters_table: Table) {
	graphwire::init().unwrap();
	let root = Value::list([
		Value::object(letters_table),
		Value::object(Person::new("ada")),
	]);

	let text = graphwire::serialize(&root).unwrap();
	let decoded = graphwire::deserialize(&text).unwrap();

	assert!(graphwire::deep_equal(&root, &decoded));
	let pretty = graphwire::serialize_with_indent(&root, 2).unwrap();
	assert!(graphwire::deep_equal(&root, &graphwire::deserialize(&pretty).unwrap()));
}

#[rstest]
fn test_non_finite_and_signed_zero(serializer: GraphSerializer) {
	let root = Value::list([
		Value::Float(f64::NAN),
		Value::Float(f64::INFINITY),
		Value::Float(f64::NEG_INFINITY),
		Value::Float(-0.0),
		Value::Float(0.0),
	]);

	let decoded = round_trip(&serializer, &root);

	let items: Vec<f64> = decoded
		.as_list()
		.unwrap()
		.snapshot()
		.iter()
		.map(|v| v.as_f64().unwrap())
		.collect();
	assert!(items[0].is_nan());
	assert_eq!(items[1], f64::INFINITY);
	assert_eq!(items[2], f64::NEG_INFINITY);
	assert!(items[3] == 0.0 && items[3].is_sign_negative());
	assert!(items[4] == 0.0 && items[4].is_sign_positive());
	assert!(serializer.deep_equal(&root, &decoded));
}

#[rstest]
#[case(0)]
#[case((1 << 53) - 1)]
#[case(1 << 53)]
#[case(-(1 << 53) - 1)]
#[case(i64::MAX)]
#[case(i64::MIN)]
fn test_integers_exact(serializer: GraphSerializer, #[case] n: i64) {
	let decoded = round_trip(&serializer, &Value::Int(n));
	assert_eq!(decoded.as_i64(), Some(n));
}

#[rstest]
fn test_null_and_undefined_stay_distinct(serializer: GraphSerializer) {
	let root = Value::map([("n", Value::Null), ("u", Value::Undefined)]);

	let decoded = round_trip(&serializer, &root);

	let map = decoded.as_map().unwrap();
	assert!(map.get("n").unwrap().is_null());
	assert!(map.get("u").unwrap().is_undefined());
}

#[rstest]
fn test_mapping_order_preserved(serializer: GraphSerializer) {
	let root = Value::map([
		("zeta", Value::Int(1)),
		("alpha", Value::Int(2)),
		("mid", Value::Int(3)),
	]);

	let decoded = round_trip(&serializer, &root);

	assert_eq!(decoded.as_map().unwrap().keys(), vec!["zeta", "alpha", "mid"]);
}

#[rstest]
fn test_datetime_nanoseconds(serializer: GraphSerializer) {
	let at = instant(5) + chrono::Duration::nanoseconds(123_456_789);

	let decoded = round_trip(&serializer, &Value::DateTime(at));

	assert_eq!(decoded.as_datetime(), Some(&at));
}

#[rstest]
#[case(Utc.with_ymd_and_hms(12000, 3, 4, 5, 6, 7).unwrap())]
#[case(Utc.with_ymd_and_hms(-50, 1, 1, 0, 0, 0).unwrap())]
#[case(Utc.with_ymd_and_hms(0, 12, 31, 23, 59, 59).unwrap())]
#[case(DateTime::<Utc>::MAX_UTC)]
#[case(DateTime::<Utc>::MIN_UTC)]
fn test_datetime_outside_four_digit_years(serializer: GraphSerializer, #[case] at: DateTime<Utc>) {
	let decoded = round_trip(&serializer, &Value::DateTime(at));

	assert_eq!(decoded.as_datetime(), Some(&at));
}

#[rstest]
fn test_datetime_column_with_far_years(serializer: GraphSerializer) {
	let values = [
		Utc.with_ymd_and_hms(12000, 1, 1, 0, 0, 0).unwrap(),
		instant(1),
		Utc.with_ymd_and_hms(-50, 6, 1, 12, 0, 0).unwrap(),
	];
	let table = Table::from_columns(None, [Column::from_datetimes("at", values)]).unwrap();

	let decoded = round_trip(&serializer, &Value::object(table));

	let column = decoded
		.as_object()
		.and_then(|o| o.with(|t: &Table| t.column("at").map(|c| c.data().clone())))
		.flatten();
	assert_eq!(column, Some(ColumnData::DateTime(values.to_vec())));
}

#[rstest]
fn test_large_mapping_keeps_order(serializer: GraphSerializer) {
	let root = Value::map((0..20_000).map(|i| (format!("key{i}"), Value::Int(i))));

	let decoded = round_trip(&serializer, &root);

	let map = decoded.as_map().unwrap();
	assert_eq!(map.len(), 20_000);
	let keys = map.keys();
	assert_eq!(keys.first().map(String::as_str), Some("key0"));
	assert_eq!(keys.last().map(String::as_str), Some("key19999"));
	assert_eq!(map.get("key12345").and_then(|v| v.as_i64()), Some(12_345));
	assert!(serializer.deep_equal(&root, &decoded));
}

#[rstest]
fn test_typed_objects_nested_in_typed_payloads(serializer: GraphSerializer, letters_table: Table) {
	let sheet = Value::object(letters_table);
	let numbers = Value::object(
		Table::from_columns(Some("n".into()), [Column::from_ints("x", [1, 2, 3])]).unwrap(),
	);
	let book = Value::object(Workbook {
		sheets: vec![sheet.clone(), numbers, sheet],
	});

	let decoded = round_trip(&serializer, &book);

	assert!(serializer.deep_equal(&book, &decoded));
	let sheets = decoded
		.as_object()
		.and_then(|o| o.with(|b: &Workbook| b.sheets.clone()))
		.unwrap();
	assert_eq!(sheets.len(), 3);
	assert!(sheets[0].same_identity(&sheets[2]));
	assert!(!sheets[0].same_identity(&sheets[1]));
}

#[rstest]
fn test_older_person_version_decodes(serializer: GraphSerializer) {
	let text = r#"{"k":"typed","tag":"Person","ver":1,"id":1,"v":{"k":"map","id":2,"v":[
		["name",{"k":"str","v":"grace"}],
		["friend",{"k":"null"}]
	]}}"#;

	let decoded = serializer.deserialize(text).unwrap();

	assert_eq!(person_field(&decoded, |p| p.name.clone()).as_deref(), Some("grace"));
	assert_eq!(person_field(&decoded, |p| p.born), Some(None));
}

#[rstest]
fn test_wire_form_is_idempotent(serializer: GraphSerializer, letters_table: Table) {
	let mut person = Person::new("lin");
	person.born = Some(instant(9));
	let root = Value::map([
		("table", Value::object(letters_table)),
		("person", Value::object(person)),
		("values", Value::list([Value::Float(f64::NAN), Value::Int(i64::MIN)])),
	]);

	let first = serializer.serialize(&root).unwrap();
	let second = serializer
		.serialize(&serializer.deserialize(&first).unwrap())
		.unwrap();

	assert_eq!(first, second);
}

proptest! {
	#[test]
	fn prop_round_trip_preserves_structure(depth in 0u32..5, seed in any::<i64>()) {
		let serializer = GraphSerializer::new(graphwire_integration_tests::registry());
		let value = nested_value(depth, seed);

		let decoded = round_trip(&serializer, &value);

		prop_assert!(serializer.deep_equal(&value, &decoded));
	}

	#[test]
	fn prop_wire_text_is_idempotent(depth in 0u32..5, seed in any::<i64>()) {
		let serializer = GraphSerializer::new(graphwire_integration_tests::registry());
		let value = nested_value(depth, seed);

		let first = serializer.serialize(&value).unwrap();
		let second = serializer.serialize(&serializer.deserialize(&first).unwrap()).unwrap();

		prop_assert_eq!(first, second);
	}

	#[test]
	fn prop_doubles_survive_bit_for_bit(bits in any::<u64>()) {
		let serializer = GraphSerializer::new(graphwire_integration_tests::registry());
		let f = f64::from_bits(bits);

		let decoded = round_trip(&serializer, &Value::Float(f));
		let back = decoded.as_f64().unwrap();

		if f.is_nan() {
			prop_assert!(back.is_nan());
		} else {
			prop_assert_eq!(back.to_bits(), f.to_bits());
		}
	}
}
