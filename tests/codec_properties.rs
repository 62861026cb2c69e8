//! Property tests: round trips of well-typed batches, and decoders that
//! never panic on arbitrary input.

use codecmp::formats::Codec;
use codecmp::{Employee, EmployeeBatch, FieldValue, JsonCodec, ProtobufCodec, XmlCodec};
use proptest::prelude::*;

/// Records the binary schema accepts.
fn schema_record() -> impl Strategy<Value = Employee> {
    (any::<i32>(), "\\PC{0,24}", any::<i32>())
        .prop_map(|(id, name, salary)| Employee::new(id, name, salary))
}

/// Records whose element text cannot be mistaken for a number or boolean.
fn xml_safe_record() -> impl Strategy<Value = Employee> {
    (any::<i32>(), "[A-Z][a-z]{0,11}", any::<i32>())
        .prop_map(|(id, name, salary)| Employee::new(id, name, salary))
}

fn any_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Integer),
        (-1.0e12..1.0e12f64).prop_map(FieldValue::Float),
        "\\PC{0,16}".prop_map(FieldValue::Text),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn protobuf_round_trips_schema_batches(records in prop::collection::vec(schema_record(), 0..40)) {
        let codec = ProtobufCodec::with_default_schema().unwrap();
        let batch = EmployeeBatch::new(records);
        let bytes = codec.encode(&batch).unwrap();
        prop_assert_eq!(codec.decode(&bytes).unwrap(), batch);
    }

    #[test]
    fn json_round_trips_any_values(
        fields in prop::collection::vec((any_value(), any_value(), any_value()), 0..20)
    ) {
        let codec = JsonCodec::new();
        let batch: EmployeeBatch = fields
            .into_iter()
            .map(|(id, name, salary)| Employee::new(id, name, salary))
            .collect();
        let bytes = codec.encode(&batch).unwrap();
        prop_assert_eq!(codec.decode(&bytes).unwrap(), batch);
    }

    #[test]
    fn xml_round_trips_plain_batches(records in prop::collection::vec(xml_safe_record(), 0..20)) {
        let codec = XmlCodec::new();
        let batch = EmployeeBatch::new(records);
        let bytes = codec.encode(&batch).unwrap();
        prop_assert_eq!(codec.decode(&bytes).unwrap(), batch);
    }

    #[test]
    fn binary_is_never_larger_than_json(records in prop::collection::vec(schema_record(), 1..20)) {
        let batch = EmployeeBatch::new(records);
        let json = JsonCodec::new().encode(&batch).unwrap();
        let binary = ProtobufCodec::with_default_schema().unwrap().encode(&batch).unwrap();
        prop_assert!(binary.len() < json.len());
    }

    #[test]
    fn decoders_never_panic(input in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = JsonCodec::new().decode(&input);
        let _ = XmlCodec::new().decode(&input);
        let _ = ProtobufCodec::with_default_schema().unwrap().decode(&input);
    }
}
