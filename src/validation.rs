//! Schema validation of employee batches.
//!
//! The binary codec checks a batch against its [`BatchLayout`] before it
//! writes any bytes. Validation walks every record and reports the first
//! field whose value kind does not fit the declared scalar type, or the first
//! `required` field the record cannot supply.
//!
//! The JSON and XML codecs never validate.

use crate::error::{CodecError, Result};
use crate::record::{EmployeeBatch, FieldValue, BATCH_FIELD};
use crate::schema::{BatchLayout, Label, ScalarType, Schema};

/// Check `batch` against the `root` message of `schema`.
///
/// # Errors
///
/// Returns [`CodecError::InvalidSchema`] if `root` does not describe a batch
/// of employee records, or [`CodecError::SchemaViolation`] for the first
/// record field that does not fit.
pub fn verify(batch: &EmployeeBatch, schema: &Schema, root: &str) -> Result<()> {
    SchemaValidator::new(schema.batch_layout(root)?).validate(batch)
}

/// Validator for batches against a resolved schema layout.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    layout: BatchLayout,
}

impl SchemaValidator {
    /// Create a validator for `layout`.
    #[must_use]
    pub fn new(layout: BatchLayout) -> Self {
        Self { layout }
    }

    /// The layout batches are checked against.
    #[must_use]
    pub const fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    /// Validate every record in `batch`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::SchemaViolation`] naming the first offending
    /// field, e.g. `employee[0].salary: integer expected`.
    pub fn validate(&self, batch: &EmployeeBatch) -> Result<()> {
        let record_type = self.layout.record();
        for (index, employee) in batch.iter().enumerate() {
            for field in record_type.fields() {
                let Some(value) = employee.get(&field.name) else {
                    if field.label == Label::Required {
                        return Err(CodecError::SchemaViolation(format!(
                            "{BATCH_FIELD}[{index}]: missing required field {}",
                            field.name
                        )));
                    }
                    continue;
                };
                // Non-scalar record fields are rejected when the layout is built
                let Some(scalar) = field.scalar() else {
                    continue;
                };
                if let Some(problem) = check_value(value, scalar) {
                    return Err(CodecError::SchemaViolation(format!(
                        "{BATCH_FIELD}[{index}].{}: {problem}",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Check one value against a scalar type, returning the problem if it does not fit.
#[must_use]
pub fn check_value(value: &FieldValue, scalar: ScalarType) -> Option<String> {
    match scalar {
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
            check_integer(value, i64::from(i32::MIN), i64::from(i32::MAX), scalar)
        },
        ScalarType::Uint32 | ScalarType::Fixed32 => {
            check_integer(value, 0, i64::from(u32::MAX), scalar)
        },
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
            check_integer(value, i64::MIN, i64::MAX, scalar)
        },
        ScalarType::Uint64 | ScalarType::Fixed64 => check_integer(value, 0, i64::MAX, scalar),
        ScalarType::Double | ScalarType::Float => {
            (!value.is_numeric()).then(|| "number expected".to_string())
        },
        ScalarType::Bool => {
            (!matches!(value, FieldValue::Bool(_))).then(|| "boolean expected".to_string())
        },
        ScalarType::String => {
            (!matches!(value, FieldValue::Text(_))).then(|| "string expected".to_string())
        },
        ScalarType::Bytes => Some("bytes fields are not supported".to_string()),
    }
}

fn check_integer(value: &FieldValue, min: i64, max: i64, scalar: ScalarType) -> Option<String> {
    match value.as_i64() {
        None => Some("integer expected".to_string()),
        Some(n) if n < min || n > max => Some(format!("{n} is out of range for {scalar}")),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Employee;
    use crate::schema::ROOT_MESSAGE;

    fn validator() -> SchemaValidator {
        SchemaValidator::new(Schema::employees().batch_layout(ROOT_MESSAGE).unwrap())
    }

    #[test]
    fn test_valid_batch_passes() {
        let batch = EmployeeBatch::new(vec![
            Employee::new(1, "Ali", 9000),
            Employee::new(2, "Kamal", 22000),
        ]);
        assert!(validator().validate(&batch).is_ok());
    }

    #[test]
    fn test_text_salary_is_violation() {
        let batch = EmployeeBatch::new(vec![
            Employee::new(1, "Ali", 9000),
            Employee::new(2, "Kamal", "nine thousand"),
        ]);
        let err = validator().validate(&batch).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema violation: employee[1].salary: integer expected"
        );
    }

    #[test]
    fn test_float_for_int32_is_violation() {
        let batch = EmployeeBatch::new(vec![Employee::new(1, "Ali", 9000.5)]);
        assert!(matches!(
            validator().validate(&batch),
            Err(CodecError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_out_of_range_int32() {
        let batch = EmployeeBatch::new(vec![Employee::new(1, "Ali", i64::from(i32::MAX) + 1)]);
        let err = validator().validate(&batch).unwrap_err().to_string();
        assert!(err.contains("out of range for int32"), "{err}");
    }

    #[test]
    fn test_numeric_name_is_violation() {
        let batch = EmployeeBatch::new(vec![Employee::new(1, 7, 10)]);
        let err = validator().validate(&batch).unwrap_err().to_string();
        assert!(err.ends_with("employee[0].name: string expected"), "{err}");
    }

    #[test]
    fn test_required_field_missing() {
        let schema = Schema::parse(
            r#"syntax = "proto2";
               message Employee {
                 required int32 id = 1;
                 required string name = 2;
                 required double salary = 3;
                 required string email = 4;
               }
               message Employees { repeated Employee employee = 1; }"#,
        )
        .unwrap();
        let validator = SchemaValidator::new(schema.batch_layout(ROOT_MESSAGE).unwrap());
        let batch = EmployeeBatch::new(vec![Employee::new(1, "Ali", 9000)]);
        let err = validator.validate(&batch).unwrap_err().to_string();
        assert!(err.contains("missing required field email"), "{err}");
    }

    #[test]
    fn test_check_value_kinds() {
        assert_eq!(check_value(&FieldValue::Integer(5), ScalarType::Double), None);
        assert_eq!(check_value(&FieldValue::Float(0.5), ScalarType::Float), None);
        assert!(check_value(&FieldValue::Integer(-1), ScalarType::Uint32).is_some());
        assert_eq!(check_value(&FieldValue::Bool(true), ScalarType::Bool), None);
        assert!(check_value(&FieldValue::Integer(1), ScalarType::Bool).is_some());
        assert!(check_value(&FieldValue::Text("x".into()), ScalarType::Int64).is_some());
    }

    #[test]
    fn test_verify_against_schema() {
        let schema = Schema::employees();
        let good = EmployeeBatch::new(vec![Employee::new(1, "Ali", 9000)]);
        assert!(verify(&good, &schema, ROOT_MESSAGE).is_ok());

        let bad = EmployeeBatch::new(vec![Employee::new("one", "Ali", 9000)]);
        assert!(matches!(
            verify(&bad, &schema, ROOT_MESSAGE),
            Err(CodecError::SchemaViolation(_))
        ));
        assert!(matches!(
            verify(&good, &schema, "Employee"),
            Err(CodecError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_empty_batch_is_valid() {
        assert!(validator().validate(&EmployeeBatch::default()).is_ok());
    }
}
