//! The codec trait every format adapter implements.
//!
//! A [`Codec`] turns a whole [`EmployeeBatch`] into bytes and back. Codecs
//! are stateless after construction and are shared across threads when the
//! harness runs formats in parallel.
//!
//! # Example
//!
//! ```
//! use codecmp::formats::{Codec, EncodedArtifact};
//! use codecmp::record::EmployeeBatch;
//!
//! fn encode_all(codecs: &[&dyn Codec], batch: &EmployeeBatch) -> codecmp::Result<Vec<EncodedArtifact>> {
//!     codecs.iter().map(|codec| codec.encode_artifact(batch)).collect()
//! }
//! ```

use super::Format;
use crate::error::Result;
use crate::record::EmployeeBatch;

/// Trait for adapters that encode and decode a batch in one format.
///
/// # Implementation Notes
///
/// Implementations should:
/// - Produce the same bytes for the same batch on every call
/// - Return [`CodecError::MalformedInput`](crate::CodecError::MalformedInput)
///   from `decode` for any input they cannot fully interpret, never a
///   partial batch
/// - Not touch the filesystem; the reporter owns artifact files
pub trait Codec: std::fmt::Debug + Send + Sync {
    /// The format this codec produces.
    fn format(&self) -> Format;

    /// Encode a batch into bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be represented in this format
    /// (for the binary format, when it violates the schema).
    fn encode(&self, batch: &EmployeeBatch) -> Result<Vec<u8>>;

    /// Decode bytes produced by [`encode`](Self::encode) back into a batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding of a batch.
    fn decode(&self, bytes: &[u8]) -> Result<EmployeeBatch>;

    /// Encode a batch and tag the bytes with this codec's format.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`encode`](Self::encode).
    fn encode_artifact(&self, batch: &EmployeeBatch) -> Result<EncodedArtifact> {
        Ok(EncodedArtifact::new(self.format(), self.encode(batch)?))
    }
}

/// A format-tagged byte sequence produced by a codec.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    format: Format,
    bytes: Vec<u8>,
}

impl EncodedArtifact {
    /// Tag `bytes` with `format`.
    #[must_use]
    pub fn new(format: Format, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    /// Format that produced the bytes.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// The encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// In-memory length of the encoded bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the encoding produced no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
