//! Schema-driven Protocol Buffers encoding of employee batches.
//!
//! The codec is built from a loaded [`Schema`] rather than generated code: the
//! root message (by default `Employees`) is written as a sequence of
//! length-delimited `employee` submessages, and each record field is written
//! with the wire type implied by its declared scalar type. Varint and key
//! encoding come from [`prost::encoding`].
//!
//! Encoding validates the batch first and fails with
//! [`CodecError::SchemaViolation`] before any bytes are produced.
//!
//! # Examples
//!
//! ```
//! use codecmp::formats::Codec;
//! use codecmp::protobuf::ProtobufCodec;
//!
//! let codec = ProtobufCodec::with_default_schema()?;
//! let batch = codecmp::dataset::build();
//! let bytes = codec.encode(&batch)?;
//! assert_eq!(codec.decode(&bytes)?, batch);
//! # Ok::<(), codecmp::CodecError>(())
//! ```

use crate::error::{CodecError, Result};
use crate::formats::{Codec, Format};
use crate::record::{Employee, EmployeeBatch, FieldValue};
use crate::schema::{BatchLayout, FieldDescriptor, Label, ScalarType, Schema, ROOT_MESSAGE};
use crate::validation::SchemaValidator;
use bytes::{Buf, BufMut};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, WireType};

/// Codec for the schema-driven binary format.
#[derive(Debug, Clone)]
pub struct ProtobufCodec {
    validator: SchemaValidator,
}

impl ProtobufCodec {
    /// Build a codec for the `root` message of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidSchema`] if the schema does not describe a
    /// batch (see [`Schema::batch_layout`]).
    pub fn new(schema: &Schema, root: &str) -> Result<Self> {
        let layout = schema.batch_layout(root)?;
        Ok(Self {
            validator: SchemaValidator::new(layout),
        })
    }

    /// Build a codec for the built-in `Employees` schema.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in schema is inconsistent.
    pub fn with_default_schema() -> Result<Self> {
        Self::new(&Schema::employees(), ROOT_MESSAGE)
    }

    /// The resolved layout this codec encodes.
    #[must_use]
    pub const fn layout(&self) -> &BatchLayout {
        self.validator.layout()
    }

    fn encode_record(&self, employee: &Employee, buf: &mut Vec<u8>) -> Result<()> {
        for field in self.layout().record().fields() {
            if let Some(value) = employee.get(&field.name) {
                encode_field(field, value, buf)?;
            }
        }
        Ok(())
    }

    fn decode_record(&self, mut buf: &[u8]) -> Result<Employee> {
        let record_type = self.layout().record();
        let mut values: Vec<Option<FieldValue>> = vec![None; record_type.fields().len()];

        while buf.has_remaining() {
            let (number, wire_type) = decode_key(&mut buf).map_err(malformed)?;
            let Some(position) = record_type
                .fields()
                .iter()
                .position(|f| f.number == number)
            else {
                skip_value(wire_type, &mut buf)?;
                continue;
            };
            let field = &record_type.fields()[position];
            let Some(scalar) = field.scalar() else {
                skip_value(wire_type, &mut buf)?;
                continue;
            };
            if wire_type != wire_type_of(scalar) {
                return Err(CodecError::malformed(
                    Format::Protobuf,
                    format!(
                        "{}.{}: expected wire type {:?}, found {wire_type:?}",
                        record_type.name(),
                        field.name,
                        wire_type_of(scalar)
                    ),
                ));
            }
            // Last occurrence wins for singular fields
            values[position] = Some(decode_scalar(scalar, &mut buf)?);
        }

        let mut resolved = Vec::with_capacity(Employee::FIELD_NAMES.len());
        for name in Employee::FIELD_NAMES {
            let position = record_type
                .fields()
                .iter()
                .position(|f| f.name == name)
                .ok_or_else(|| {
                    CodecError::InvalidSchema(format!(
                        "{} does not declare field {name}",
                        record_type.name()
                    ))
                })?;
            let field = &record_type.fields()[position];
            let value = match values[position].take() {
                Some(value) => value,
                None if field.label == Label::Required => {
                    return Err(CodecError::malformed(
                        Format::Protobuf,
                        format!("{}: missing required field {name}", record_type.name()),
                    ))
                },
                None => default_value(field.scalar().unwrap_or(ScalarType::String)),
            };
            resolved.push(value);
        }
        let [id, name, salary]: [FieldValue; 3] = resolved.try_into().map_err(|_| {
            CodecError::malformed(Format::Protobuf, "record did not resolve to three fields")
        })?;
        Ok(Employee { id, name, salary })
    }
}

impl Codec for ProtobufCodec {
    fn format(&self) -> Format {
        Format::Protobuf
    }

    fn encode(&self, batch: &EmployeeBatch) -> Result<Vec<u8>> {
        self.validator.validate(batch)?;

        let container = self.layout().container().number;
        let mut out = Vec::new();
        let mut record = Vec::new();
        for employee in batch {
            record.clear();
            self.encode_record(employee, &mut record)?;
            encode_key(container, WireType::LengthDelimited, &mut out);
            encode_varint(record.len() as u64, &mut out);
            out.put_slice(&record);
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<EmployeeBatch> {
        let container = self.layout().container().number;
        let mut buf = bytes;
        let mut employees = Vec::new();

        while buf.has_remaining() {
            let (number, wire_type) = decode_key(&mut buf).map_err(malformed)?;
            if number != container {
                skip_value(wire_type, &mut buf)?;
                continue;
            }
            if wire_type != WireType::LengthDelimited {
                return Err(CodecError::malformed(
                    Format::Protobuf,
                    format!(
                        "{}.{}: expected a length-delimited submessage, found {wire_type:?}",
                        self.layout().root(),
                        self.layout().container().name
                    ),
                ));
            }
            let body = take_length_delimited(&mut buf)?;
            employees.push(self.decode_record(body)?);
        }

        Ok(EmployeeBatch::new(employees))
    }
}

fn malformed(e: prost::DecodeError) -> CodecError {
    CodecError::malformed(Format::Protobuf, e.to_string())
}

/// Wire type used for values of `scalar`.
#[must_use]
pub const fn wire_type_of(scalar: ScalarType) -> WireType {
    match scalar {
        ScalarType::Int32
        | ScalarType::Int64
        | ScalarType::Uint32
        | ScalarType::Uint64
        | ScalarType::Sint32
        | ScalarType::Sint64
        | ScalarType::Bool => WireType::Varint,
        ScalarType::Fixed64 | ScalarType::Sfixed64 | ScalarType::Double => WireType::SixtyFourBit,
        ScalarType::Fixed32 | ScalarType::Sfixed32 | ScalarType::Float => WireType::ThirtyTwoBit,
        ScalarType::String | ScalarType::Bytes => WireType::LengthDelimited,
    }
}

/// Default value of a field absent from the wire.
fn default_value(scalar: ScalarType) -> FieldValue {
    match scalar {
        ScalarType::Double | ScalarType::Float => FieldValue::Float(0.0),
        ScalarType::Bool => FieldValue::Bool(false),
        ScalarType::String | ScalarType::Bytes => FieldValue::Text(String::new()),
        _ => FieldValue::Integer(0),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn encode_field(field: &FieldDescriptor, value: &FieldValue, buf: &mut Vec<u8>) -> Result<()> {
    let Some(scalar) = field.scalar() else {
        return Err(CodecError::SchemaViolation(format!(
            "{}: only scalar record fields can be encoded",
            field.name
        )));
    };
    let mismatch = || {
        CodecError::SchemaViolation(format!(
            "{}: {} value cannot be written as {scalar}",
            field.name,
            value.kind()
        ))
    };

    encode_key(field.number, wire_type_of(scalar), buf);
    match scalar {
        // Negative int32/int64 values are sign-extended to ten bytes
        ScalarType::Int32 | ScalarType::Int64 | ScalarType::Uint32 | ScalarType::Uint64 => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            encode_varint(n as u64, buf);
        },
        ScalarType::Sint32 => {
            let n = value.as_i64().ok_or_else(mismatch)? as i32;
            encode_varint(u64::from(((n << 1) ^ (n >> 31)) as u32), buf);
        },
        ScalarType::Sint64 => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            encode_varint(((n << 1) ^ (n >> 63)) as u64, buf);
        },
        ScalarType::Bool => {
            let FieldValue::Bool(b) = value else {
                return Err(mismatch());
            };
            encode_varint(u64::from(*b), buf);
        },
        ScalarType::Fixed32 => buf.put_u32_le(value.as_i64().ok_or_else(mismatch)? as u32),
        ScalarType::Sfixed32 => buf.put_i32_le(value.as_i64().ok_or_else(mismatch)? as i32),
        ScalarType::Fixed64 => buf.put_u64_le(value.as_i64().ok_or_else(mismatch)? as u64),
        ScalarType::Sfixed64 => buf.put_i64_le(value.as_i64().ok_or_else(mismatch)?),
        ScalarType::Float => buf.put_f32_le(value.as_f64().ok_or_else(mismatch)? as f32),
        ScalarType::Double => buf.put_f64_le(value.as_f64().ok_or_else(mismatch)?),
        ScalarType::String => {
            let text = value.as_str().ok_or_else(mismatch)?;
            encode_varint(text.len() as u64, buf);
            buf.put_slice(text.as_bytes());
        },
        ScalarType::Bytes => return Err(mismatch()),
    }
    Ok(())
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn decode_scalar(scalar: ScalarType, buf: &mut &[u8]) -> Result<FieldValue> {
    let value = match scalar {
        ScalarType::Int32 => FieldValue::Integer(i64::from(varint(buf)? as i32)),
        ScalarType::Int64 => FieldValue::Integer(varint(buf)? as i64),
        ScalarType::Uint32 => FieldValue::Integer(i64::from(varint(buf)? as u32)),
        ScalarType::Uint64 => FieldValue::Integer(unsigned_to_i64(varint(buf)?)?),
        ScalarType::Sint32 => {
            let n = varint(buf)? as u32;
            FieldValue::Integer(i64::from(((n >> 1) as i32) ^ -((n & 1) as i32)))
        },
        ScalarType::Sint64 => {
            let n = varint(buf)?;
            FieldValue::Integer(((n >> 1) as i64) ^ -((n & 1) as i64))
        },
        ScalarType::Bool => FieldValue::Bool(varint(buf)? != 0),
        ScalarType::Fixed32 => {
            ensure_remaining(buf, 4)?;
            FieldValue::Integer(i64::from(buf.get_u32_le()))
        },
        ScalarType::Sfixed32 => {
            ensure_remaining(buf, 4)?;
            FieldValue::Integer(i64::from(buf.get_i32_le()))
        },
        ScalarType::Float => {
            ensure_remaining(buf, 4)?;
            FieldValue::Float(f64::from(buf.get_f32_le()))
        },
        ScalarType::Fixed64 => {
            ensure_remaining(buf, 8)?;
            FieldValue::Integer(unsigned_to_i64(buf.get_u64_le())?)
        },
        ScalarType::Sfixed64 => {
            ensure_remaining(buf, 8)?;
            FieldValue::Integer(buf.get_i64_le())
        },
        ScalarType::Double => {
            ensure_remaining(buf, 8)?;
            FieldValue::Float(buf.get_f64_le())
        },
        ScalarType::String | ScalarType::Bytes => {
            let raw = take_length_delimited(buf)?;
            let text = std::str::from_utf8(raw).map_err(|e| {
                CodecError::malformed(Format::Protobuf, format!("Invalid UTF-8 in string: {e}"))
            })?;
            FieldValue::Text(text.to_string())
        },
    };
    Ok(value)
}

fn varint(buf: &mut &[u8]) -> Result<u64> {
    decode_varint(buf).map_err(malformed)
}

fn unsigned_to_i64(n: u64) -> Result<i64> {
    i64::try_from(n).map_err(|_| {
        CodecError::malformed(
            Format::Protobuf,
            format!("unsigned value {n} does not fit a signed 64-bit integer"),
        )
    })
}

fn ensure_remaining(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(CodecError::malformed(
            Format::Protobuf,
            format!("needed {needed} bytes, {} remaining", buf.len()),
        ));
    }
    Ok(())
}

fn take_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = varint(buf)?;
    let len = usize::try_from(len)
        .ok()
        .filter(|len| *len <= buf.len())
        .ok_or_else(|| {
            CodecError::malformed(
                Format::Protobuf,
                format!("length {len} exceeds the {} bytes remaining", buf.len()),
            )
        })?;
    let whole: &'a [u8] = *buf;
    let (head, tail) = whole.split_at(len);
    *buf = tail;
    Ok(head)
}

fn skip_value(wire_type: WireType, buf: &mut &[u8]) -> Result<()> {
    match wire_type {
        WireType::Varint => {
            varint(buf)?;
        },
        WireType::SixtyFourBit => {
            ensure_remaining(buf, 8)?;
            buf.advance(8);
        },
        WireType::ThirtyTwoBit => {
            ensure_remaining(buf, 4)?;
            buf.advance(4);
        },
        WireType::LengthDelimited => {
            take_length_delimited(buf)?;
        },
        WireType::StartGroup | WireType::EndGroup => {
            return Err(CodecError::malformed(
                Format::Protobuf,
                "groups are not supported",
            ))
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> EmployeeBatch {
        EmployeeBatch::new(vec![
            Employee::new(1, "Ali", 9000),
            Employee::new(2, "Kamal", 22000),
            Employee::new(3, "Amal", 23000),
        ])
    }

    fn codec() -> ProtobufCodec {
        ProtobufCodec::with_default_schema().unwrap()
    }

    fn codec_for(record_fields: &str) -> ProtobufCodec {
        let text = format!(
            "message Employee {{ {record_fields} }} message Employees {{ repeated Employee employee = 1; }}"
        );
        ProtobufCodec::new(&Schema::parse(&text).unwrap(), ROOT_MESSAGE).unwrap()
    }

    #[test]
    fn test_encode_known_bytes() {
        let batch = EmployeeBatch::new(vec![Employee::new(1, "Ali", 9000)]);
        let bytes = codec().encode(&batch).unwrap();
        assert_eq!(
            bytes,
            vec![
                0x0A, 0x0A, // employee, 10 bytes
                0x08, 0x01, // id = 1
                0x12, 0x03, b'A', b'l', b'i', // name = "Ali"
                0x18, 0xA8, 0x46, // salary = 9000
            ]
        );
    }

    #[test]
    fn test_protobuf_roundtrip() {
        let batch = sample_batch();
        let bytes = codec().encode(&batch).unwrap();
        assert_eq!(bytes.len(), 41);
        assert_eq!(codec().decode(&bytes).unwrap(), batch);
    }

    #[test]
    fn test_schema_violation_before_bytes() {
        let batch = EmployeeBatch::new(vec![Employee::new(1, "Ali", "nine thousand")]);
        let err = codec().encode(&batch).unwrap_err();
        assert!(matches!(err, CodecError::SchemaViolation(_)));
    }

    #[test]
    fn test_truncated_bytes_are_malformed() {
        let bytes = codec().encode(&sample_batch()).unwrap();
        assert_eq!(bytes.len(), 41);
        for cut in 1..bytes.len() {
            if RECORD_BOUNDARIES.contains(&cut) {
                continue;
            }
            let err = codec().decode(&bytes[..cut]).unwrap_err();
            assert!(
                matches!(
                    err,
                    CodecError::MalformedInput {
                        format: Format::Protobuf,
                        ..
                    }
                ),
                "cut at {cut}: {err:?}"
            );
        }
    }

    // Offsets just past the first and second sample records
    const RECORD_BOUNDARIES: [usize; 2] = [12, 27];

    #[test]
    fn test_cut_at_record_boundary_keeps_whole_records() {
        let batch = sample_batch();
        let bytes = codec().encode(&batch).unwrap();
        for (kept, cut) in RECORD_BOUNDARIES.into_iter().enumerate() {
            let decoded = codec().decode(&bytes[..cut]).unwrap();
            assert_eq!(decoded.employees, batch.employees[..=kept]);
        }
    }

    #[test]
    fn test_renumbered_container_key_drops_record() {
        let batch = sample_batch();
        let mut bytes = codec().encode(&batch).unwrap();
        assert_eq!(bytes[0], 0x0A);
        // field 2, length-delimited: an unknown field of Employees
        bytes[0] = 0x12;
        let decoded = codec().decode(&bytes).unwrap();
        assert_eq!(decoded.employees, batch.employees[1..]);
    }

    #[test]
    fn test_wrong_wire_type_is_malformed() {
        // employee submessage containing name (field 2) as a varint
        let bytes = [0x0A, 0x02, 0x10, 0x01];
        assert!(codec().decode(&bytes).is_err());
        // employee field as a varint at the root
        assert!(codec().decode(&[0x08, 0x01]).is_err());
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let bytes = [0x0A, 0x04, 0x12, 0x02, 0xFF, 0xFE];
        let err = codec().decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        // root field 2 (varint), then employee with unknown field 9 (fixed64)
        let mut bytes = vec![0x10, 0x05];
        bytes.extend([0x0A, 0x0B, 0x08, 0x07, 0x49]);
        bytes.extend([0u8; 8]);
        let batch = codec().decode(&bytes).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.employees[0].id, FieldValue::Integer(7));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let batch = codec().decode(&[0x0A, 0x00]).unwrap();
        assert_eq!(batch.employees[0], Employee::new(0, "", 0));
        assert!(codec().decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_negative_and_zigzag_values() {
        let codec = codec_for("sint64 id = 1; string name = 2; int32 salary = 3;");
        let batch = EmployeeBatch::new(vec![Employee::new(-3, "Neg", -5)]);
        let bytes = codec.encode(&batch).unwrap();
        // zigzag(-3) = 5, one byte; int32 -5 is sign-extended to ten bytes
        assert_eq!(&bytes[2..4], &[0x08, 0x05]);
        assert_eq!(codec.decode(&bytes).unwrap(), batch);
    }

    #[test]
    fn test_fixed_and_floating_types() {
        let codec = codec_for("fixed32 id = 1; string name = 2; double salary = 3;");
        let batch = EmployeeBatch::new(vec![Employee::new(7, "Ali", 9000.5)]);
        let decoded = codec.decode(&codec.encode(&batch).unwrap()).unwrap();
        assert_eq!(decoded, batch);

        let integral = EmployeeBatch::new(vec![Employee::new(7, "Ali", 9000)]);
        let decoded = codec.decode(&codec.encode(&integral).unwrap()).unwrap();
        assert_eq!(decoded.employees[0].salary, FieldValue::Float(9000.0));
        assert_eq!(decoded.first_difference(&integral), None);
    }

    #[test]
    fn test_required_field_absent_on_wire() {
        let codec = codec_for("required int32 id = 1; string name = 2; int32 salary = 3;");
        let err = codec.decode(&[0x0A, 0x00]).unwrap_err();
        assert!(err.to_string().contains("missing required field id"));
    }
}
