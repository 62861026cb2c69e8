//! JSON encoding and decoding of employee batches.
//!
//! The JSON form is the compact serde representation of
//! [`EmployeeBatch`]: `{"employee":[{"id":1,"name":"Ali","salary":9000},...]}`.
//!
//! # Examples
//!
//! ```
//! use codecmp::formats::Codec;
//! use codecmp::json::JsonCodec;
//!
//! let bytes = JsonCodec::new().encode(&codecmp::dataset::build())?;
//! assert!(bytes.starts_with(br#"{"employee":[{"id":1,"name":"Ali""#));
//! # Ok::<(), codecmp::CodecError>(())
//! ```

use crate::error::{CodecError, Result};
use crate::formats::{Codec, Format};
use crate::record::EmployeeBatch;
use serde_json::Value;

/// Codec for compact JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn encode(&self, batch: &EmployeeBatch) -> Result<Vec<u8>> {
        serde_json::to_vec(batch).map_err(|e| unrepresentable(&e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<EmployeeBatch> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::malformed(Format::Json, e.to_string()))
    }
}

/// Convert a batch to its JSON value form.
///
/// This is the intermediate structure the XML codec maps to elements.
///
/// # Errors
///
/// Returns [`CodecError::Unrepresentable`] if serialization fails. Non-finite
/// floats do not fail; `serde_json` writes them as `null`.
pub fn batch_to_value(batch: &EmployeeBatch) -> Result<Value> {
    serde_json::to_value(batch).map_err(|e| unrepresentable(&e))
}

// Only reachable through a serializer error; `FieldValue` has no map keys
// and serde_json writes non-finite floats as `null`.
fn unrepresentable(e: &serde_json::Error) -> CodecError {
    CodecError::Unrepresentable {
        format: Format::Json,
        message: e.to_string(),
    }
}

/// Convert a JSON value back into a batch.
///
/// `format` names the codec the value came from, for error reporting.
///
/// # Errors
///
/// Returns [`CodecError::MalformedInput`] if the value does not have the batch shape.
pub fn value_to_batch(value: Value, format: Format) -> Result<EmployeeBatch> {
    serde_json::from_value(value).map_err(|e| CodecError::malformed(format, e.to_string()))
}
