//! Empty Value Property Tests
//!
//! For any field shape and any constraint list:
//! - A required empty value yields exactly one `required` error
//! - An optional empty value is valid
//! - A value that passes is unaffected by coercion being enabled for typed input

use fieldspec::model::{ConstraintDescriptor, DataType, FieldSpec, Value};
use fieldspec::validation::{ErrorKind, FieldValidator, ValidationOptions};
use proptest::prelude::*;

fn arb_data_type() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::String),
        Just(DataType::Number),
        Just(DataType::Date),
        Just(DataType::Boolean),
    ]
}

fn arb_constraint() -> impl Strategy<Value = ConstraintDescriptor> {
    prop_oneof![
        (0usize..20).prop_map(|n| ConstraintDescriptor::min_length("min_length", n)),
        (0usize..20).prop_map(|n| ConstraintDescriptor::max_length("max_length", n)),
        (-100.0f64..100.0).prop_map(|n| ConstraintDescriptor::min_value("min_value", n)),
        (-100.0f64..100.0).prop_map(|n| ConstraintDescriptor::max_value("max_value", n)),
        Just(ConstraintDescriptor::pattern("pattern", "^[a-z]+$")),
        Just(ConstraintDescriptor::min_date("min_date", "2020-01-01")),
        Just(ConstraintDescriptor::range("range", Some(0.0), Some(10.0))),
    ]
}

fn arb_field() -> impl Strategy<Value = FieldSpec> {
    (
        arb_data_type(),
        any::<bool>(),
        prop::collection::vec(arb_constraint(), 0..5),
    )
        .prop_map(|(data_type, multiple, constraints)| {
            let mut spec = FieldSpec::new("field", data_type);
            spec.expect_multiple_values = multiple;
            // Names must be unique within a field
            for (i, mut constraint) in constraints.into_iter().enumerate() {
                constraint.name = format!("{}_{}", constraint.name, i);
                spec = spec.with_constraint(constraint);
            }
            spec
        })
}

fn arb_empty() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::String(String::new())),
        Just(Value::List(Vec::new())),
    ]
}

fn arb_typed_number() -> impl Strategy<Value = Value> {
    (-1000i32..1000).prop_map(Value::from)
}

proptest! {
    #[test]
    fn required_empty_yields_single_required_error(
        spec in arb_field(),
        empty in arb_empty(),
        coercion in any::<bool>(),
    ) {
        let spec = spec.required();
        let options = if coercion { ValidationOptions::with_coercion() } else { ValidationOptions::default() };
        let result = FieldValidator::with_options(options).validate(&spec, &empty);

        prop_assert!(!result.is_valid());
        prop_assert_eq!(result.errors().len(), 1);
        prop_assert_eq!(result.errors()[0].kind, ErrorKind::Required);
    }

    #[test]
    fn optional_empty_is_valid(spec in arb_field(), empty in arb_empty()) {
        let result = FieldValidator::new().validate(&spec, &empty);
        prop_assert!(result.is_valid());
    }

    #[test]
    fn coercion_is_noop_on_typed_numbers(
        constraints in prop::collection::vec(arb_constraint(), 0..5),
        value in arb_typed_number(),
    ) {
        let mut spec = FieldSpec::number("n");
        for (i, mut constraint) in constraints.into_iter().enumerate() {
            constraint.name = format!("c{}", i);
            spec = spec.with_constraint(constraint);
        }
        let plain = FieldValidator::new().validate(&spec, &value);
        let coerced = FieldValidator::with_options(ValidationOptions::with_coercion()).validate(&spec, &value);
        prop_assert_eq!(plain, coerced);
    }
}
