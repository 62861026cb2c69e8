//! Multi-format support for employee batches.
//!
//! This module provides a unified interface for encoding and decoding a batch
//! in each format under comparison. All formats implement the same
//! [`Codec`] trait, allowing format-agnostic harness code.
//!
//! # Supported Formats
//!
//! | Format | Module | Artifact |
//! |--------|--------|----------|
//! | JSON | [`json`](crate::json) | `data.json` |
//! | XML | [`xml`](crate::xml) | `data.xml` |
//! | Protobuf | [`protobuf`](crate::protobuf) | `data.proto` |
//!
//! # Usage
//!
//! ```
//! use codecmp::formats::Codec;
//! use codecmp::json::JsonCodec;
//!
//! let batch = codecmp::dataset::build();
//! let codec = JsonCodec::new();
//! let bytes = codec.encode(&batch)?;
//! assert_eq!(codec.decode(&bytes)?, batch);
//! # Ok::<(), codecmp::CodecError>(())
//! ```

mod traits;

pub use traits::{Codec, EncodedArtifact};

use serde::{Deserialize, Serialize};

/// Formats under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Compact JSON text
    Json,
    /// Compact attribute-free XML wrapped in `<root>`
    Xml,
    /// Schema-driven Protocol Buffers binary
    Protobuf,
}

impl Format {
    /// All formats, in reporting order.
    pub const ALL: [Self; 3] = [Self::Json, Self::Xml, Self::Protobuf];

    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    ///
    /// # Example
    ///
    /// ```
    /// use codecmp::formats::Format;
    ///
    /// assert_eq!(Format::from_extension("proto"), Some(Format::Protobuf));
    /// assert_eq!(Format::from_extension("unknown"), None);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "proto" | "pb" | "bin" => Some(Self::Protobuf),
            _ => None,
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Protobuf => "proto",
        }
    }

    /// Get the human-readable name for this format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Protobuf => "Protobuf",
        }
    }

    /// Artifact file name used by the reporter (`data.<ext>`).
    #[must_use]
    pub fn artifact_file_name(&self) -> String {
        format!("data.{}", self.extension())
    }

    /// Returns true for the schema-driven binary format.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Protobuf)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "protobuf" | "proto" | "binary" => Ok(Self::Protobuf),
            other => Err(format!(
                "Unknown format `{other}`. Supported formats: {}",
                Self::ALL
                    .iter()
                    .map(|f| f.name().to_lowercase())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}
