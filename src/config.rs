//! Configuration for comparison runs.
//!
//! This module provides the [`HarnessConfig`] struct which controls which
//! formats are compared, on which dataset, and where artifacts land. A config
//! can be built in code or loaded from TOML; every key is optional.
//!
//! ```toml
//! output_dir = "out"
//! formats = ["json", "protobuf"]
//! schema_path = "proto/employee.proto"
//! parallel = true
//! json_report = "out/report.json"
//!
//! [dataset]
//! kind = "generated"
//! count = 10000
//! seed = 42
//! ```

use crate::dataset::DatasetSpec;
use crate::error::{CodecError, Result};
use crate::formats::Format;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for a comparison run.
///
/// # Examples
///
/// ```
/// use codecmp::config::HarnessConfig;
/// use codecmp::formats::Format;
///
/// let config = HarnessConfig {
///     formats: vec![Format::Json, Format::Protobuf],
///     parallel: true,
///     ..Default::default()
/// };
/// assert!(config.verify_round_trip);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory the `data.*` artifacts are written to.
    pub output_dir: PathBuf,

    /// Formats to compare, in reporting order.
    pub formats: Vec<Format>,

    /// Dataset to encode.
    pub dataset: DatasetSpec,

    /// `.proto` file for the binary codec; the built-in schema when `None`.
    pub schema_path: Option<PathBuf>,

    /// Run the per-format encode/decode pairs on the rayon pool.
    pub parallel: bool,

    /// Check that every decoded batch matches the input.
    pub verify_round_trip: bool,

    /// Also write the report as JSON to this path.
    pub json_report: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            formats: Format::ALL.to_vec(),
            dataset: DatasetSpec::default(),
            schema_path: None,
            parallel: false,
            verify_round_trip: true,
            json_report: None,
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Config`] if the text is not valid TOML, has
    /// unknown keys, or lists no formats.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| CodecError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::IoError`] if the file cannot be read, or
    /// [`CodecError::Config`] if it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            CodecError::Config(message) => {
                CodecError::Config(format!("{}: {message}", path.display()))
            },
            other => other,
        })
    }

    /// Reject configurations no run can satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Config`] if no formats are selected or one is
    /// listed twice.
    pub fn check(&self) -> Result<()> {
        if self.formats.is_empty() {
            return Err(CodecError::Config("no formats selected".to_string()));
        }
        for (i, format) in self.formats.iter().enumerate() {
            if self.formats[..i].contains(format) {
                return Err(CodecError::Config(format!("format {format} listed twice")));
            }
        }
        Ok(())
    }
}
