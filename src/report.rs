//! Artifact persistence and the size/timing comparison report.
//!
//! The reporter writes every encoded artifact to `<output_dir>/data.<ext>`
//! and sizes it by reading the file's metadata back, so the figures match
//! what `ls -l` shows. Reductions are always relative to JSON.
//!
//! # Examples
//!
//! ```no_run
//! use codecmp::formats::Codec;
//! use codecmp::json::JsonCodec;
//! use codecmp::report::ComparisonReporter;
//!
//! let artifact = JsonCodec::new().encode_artifact(&codecmp::dataset::build())?;
//! let report = ComparisonReporter::new("out").report(&[artifact], Vec::new())?;
//! println!("{report}");
//! # Ok::<(), codecmp::CodecError>(())
//! ```

use crate::error::{CodecError, Result};
use crate::formats::{EncodedArtifact, Format};
use crate::timing::TimingSample;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Size reduction of `size` relative to `json_size`, as a percentage rounded
/// to two decimals.
///
/// Positive means smaller than JSON. Returns `None` when `json_size` is zero.
///
/// # Examples
///
/// ```
/// use codecmp::report::size_reduction;
///
/// assert_eq!(size_reduction(127, 41), Some(67.72));
/// assert_eq!(size_reduction(0, 41), None);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn size_reduction(json_size: u64, size: u64) -> Option<f64> {
    if json_size == 0 {
        return None;
    }
    let json = json_size as f64;
    let percent = (json - size as f64) / json * 100.0;
    Some((percent * 100.0).round() / 100.0)
}

/// On-disk size of one written artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSize {
    /// Format of the artifact
    pub format: Format,
    /// Where the artifact was written
    pub path: PathBuf,
    /// File length in bytes
    pub bytes: u64,
    /// Reduction relative to JSON in percent, if a JSON artifact exists
    pub reduction_vs_json: Option<f64>,
}

/// Timings and sizes of one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    timings: Vec<TimingSample>,
    artifacts: Vec<ArtifactSize>,
    binary_vs_json_reduction: Option<f64>,
}

impl ComparisonReport {
    /// Timings in the order they were recorded.
    #[must_use]
    pub fn timings(&self) -> &[TimingSample] {
        &self.timings
    }

    /// Artifact sizes in the order the artifacts were given.
    #[must_use]
    pub fn artifacts(&self) -> &[ArtifactSize] {
        &self.artifacts
    }

    /// Size entry for `format`, if it was reported.
    #[must_use]
    pub fn artifact(&self, format: Format) -> Option<&ArtifactSize> {
        self.artifacts.iter().find(|a| a.format == format)
    }

    /// Headline figure: binary size reduction relative to JSON.
    ///
    /// `None` if either artifact is missing or JSON is empty.
    #[must_use]
    pub const fn binary_vs_json_reduction(&self) -> Option<f64> {
        self.binary_vs_json_reduction
    }

    /// Serialize the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CodecError::IoError(e.into()))
    }

    /// Write the JSON form of the report to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "wrote JSON report");
        Ok(())
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timings:")?;
        for sample in &self.timings {
            writeln!(f, "  {:<18} {:>10.3} ms", sample.label(), sample.millis())?;
        }
        writeln!(f, "Sizes:")?;
        for artifact in &self.artifacts {
            write!(
                f,
                "  {:<10} {:<12} {:>10} bytes",
                artifact.format.name(),
                artifact.path.file_name().map_or_else(
                    || artifact.path.display().to_string(),
                    |name| name.to_string_lossy().into_owned()
                ),
                artifact.bytes
            )?;
            match artifact.reduction_vs_json {
                Some(reduction) if artifact.format != Format::Json => {
                    writeln!(f, "  ({reduction:+.2}% vs JSON)")?;
                },
                _ => writeln!(f)?,
            }
        }
        if let Some(reduction) = self.binary_vs_json_reduction {
            let direction = if reduction < 0.0 { "larger" } else { "smaller" };
            write!(
                f,
                "{} is about {:.2}% {direction} than JSON",
                Format::Protobuf.name(),
                reduction.abs()
            )?;
        }
        Ok(())
    }
}

/// Writes artifacts into an output directory and builds the report.
#[derive(Debug, Clone)]
pub struct ComparisonReporter {
    output_dir: PathBuf,
}

impl ComparisonReporter {
    /// Create a reporter writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory artifacts are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path an artifact of `format` is written to.
    #[must_use]
    pub fn artifact_path(&self, format: Format) -> PathBuf {
        self.output_dir.join(format.artifact_file_name())
    }

    /// Persist `artifacts`, measure their on-disk sizes, and assemble the report.
    ///
    /// The output directory is created if missing. Existing artifact files
    /// are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::IoError`](crate::CodecError::IoError) if a file
    /// cannot be written or its metadata read.
    pub fn report(
        &self,
        artifacts: &[EncodedArtifact],
        timings: Vec<TimingSample>,
    ) -> Result<ComparisonReport> {
        fs::create_dir_all(&self.output_dir)?;

        let mut sizes = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let path = self.artifact_path(artifact.format());
            fs::write(&path, artifact.bytes())?;
            let bytes = fs::metadata(&path)?.len();
            tracing::debug!(format = %artifact.format(), path = %path.display(), bytes, "wrote artifact");
            sizes.push((artifact.format(), path, bytes));
        }

        let json_size = sizes
            .iter()
            .find(|(format, _, _)| *format == Format::Json)
            .map(|(_, _, bytes)| *bytes);

        let artifacts: Vec<ArtifactSize> = sizes
            .into_iter()
            .map(|(format, path, bytes)| ArtifactSize {
                format,
                path,
                bytes,
                reduction_vs_json: json_size.and_then(|json| size_reduction(json, bytes)),
            })
            .collect();

        let binary_vs_json_reduction = artifacts
            .iter()
            .find(|a| a.format.is_binary())
            .and_then(|a| a.reduction_vs_json);

        Ok(ComparisonReport {
            timings,
            artifacts,
            binary_vs_json_reduction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn artifact(format: Format, len: usize) -> EncodedArtifact {
        EncodedArtifact::new(format, vec![b'x'; len])
    }

    #[test]
    fn test_size_reduction_rounding() {
        assert_eq!(size_reduction(127, 41), Some(67.72));
        assert_eq!(size_reduction(100, 100), Some(0.0));
        assert_eq!(size_reduction(127, 224), Some(-76.38));
        assert_eq!(size_reduction(3, 1), Some(66.67));
    }

    #[test]
    fn test_size_reduction_zero_json() {
        assert_eq!(size_reduction(0, 0), None);
    }

    #[test]
    fn test_report_writes_files_and_sizes() {
        let dir = TempDir::new().unwrap();
        let reporter = ComparisonReporter::new(dir.path());
        let report = reporter
            .report(
                &[
                    artifact(Format::Json, 127),
                    artifact(Format::Xml, 224),
                    artifact(Format::Protobuf, 41),
                ],
                vec![TimingSample::new("JSON encode", Duration::from_millis(1))],
            )
            .unwrap();

        assert_eq!(report.artifacts().len(), 3);
        let proto = report.artifact(Format::Protobuf).unwrap();
        assert_eq!(proto.bytes, 41);
        assert_eq!(proto.path, dir.path().join("data.proto"));
        assert_eq!(fs::read(&proto.path).unwrap().len(), 41);
        assert_eq!(report.binary_vs_json_reduction(), Some(67.72));
        assert_eq!(
            report.artifact(Format::Xml).unwrap().reduction_vs_json,
            Some(-76.38)
        );

        let text = report.to_string();
        assert!(text.contains("JSON encode"), "{text}");
        assert!(text.contains("data.xml"), "{text}");
        assert!(text.ends_with("Protobuf is about 67.72% smaller than JSON"), "{text}");
    }

    #[test]
    fn test_missing_json_has_no_headline() {
        let dir = TempDir::new().unwrap();
        let report = ComparisonReporter::new(dir.path())
            .report(&[artifact(Format::Protobuf, 10)], Vec::new())
            .unwrap();
        assert_eq!(report.binary_vs_json_reduction(), None);
        assert_eq!(report.artifact(Format::Protobuf).unwrap().reduction_vs_json, None);
        assert!(!report.to_string().contains("than JSON"));
    }

    #[test]
    fn test_empty_json_has_no_headline() {
        let dir = TempDir::new().unwrap();
        let report = ComparisonReporter::new(dir.path())
            .report(
                &[artifact(Format::Json, 0), artifact(Format::Protobuf, 0)],
                Vec::new(),
            )
            .unwrap();
        assert_eq!(report.binary_vs_json_reduction(), None);
    }

    #[test]
    fn test_larger_binary_headline() {
        let dir = TempDir::new().unwrap();
        let report = ComparisonReporter::new(dir.path())
            .report(
                &[artifact(Format::Json, 10), artifact(Format::Protobuf, 15)],
                Vec::new(),
            )
            .unwrap();
        assert!(report
            .to_string()
            .ends_with("Protobuf is about 50.00% larger than JSON"));
    }

    #[test]
    fn test_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ComparisonReporter::new(&nested)
            .report(&[artifact(Format::Json, 2)], Vec::new())
            .unwrap();
        assert!(nested.join("data.json").exists());
    }

    #[test]
    fn test_json_report_fields() {
        let dir = TempDir::new().unwrap();
        let report = ComparisonReporter::new(dir.path())
            .report(
                &[artifact(Format::Json, 4), artifact(Format::Protobuf, 1)],
                vec![TimingSample::new("Protobuf encode", Duration::from_millis(2))],
            )
            .unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["timings"][0]["label"], "Protobuf encode");
        assert_eq!(value["timings"][0]["duration_ms"], 2.0);
        assert_eq!(value["artifacts"][1]["format"], "protobuf");
        assert_eq!(value["artifacts"][1]["bytes"], 1);
        assert_eq!(value["artifacts"][1]["reduction_vs_json"], 75.0);
        assert_eq!(value["binary_vs_json_reduction"], 75.0);
    }
}
