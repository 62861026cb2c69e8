//! The comparison run: dataset in, artifacts and report out.
//!
//! A [`Harness`] owns one codec per configured format. [`Harness::run`]
//! builds the dataset, then for every codec encodes the batch, decodes the
//! bytes again (both timed), and optionally checks the decoded batch against
//! the input. The artifacts and timings go to a [`ComparisonReporter`].
//!
//! Codec runs are independent; with `parallel` set they execute on rayon's
//! pool and the results are collected back in configured format order.
//!
//! # Examples
//!
//! ```no_run
//! use codecmp::config::HarnessConfig;
//! use codecmp::harness::Harness;
//!
//! let outcome = Harness::new(HarnessConfig::default())?.run()?;
//! println!("{}", outcome.report);
//! # Ok::<(), codecmp::CodecError>(())
//! ```

use crate::config::HarnessConfig;
use crate::error::{CodecError, Result};
use crate::formats::{Codec, EncodedArtifact, Format};
use crate::json::JsonCodec;
use crate::protobuf::ProtobufCodec;
use crate::record::EmployeeBatch;
use crate::report::{ComparisonReport, ComparisonReporter};
use crate::schema::{Schema, ROOT_MESSAGE};
use crate::timing::{try_measure, TimingSample};
use crate::xml::XmlCodec;
use rayon::prelude::*;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Number of records in the encoded batch
    pub records: usize,
    /// Timings and sizes
    pub report: ComparisonReport,
}

/// Encode/decode output of a single codec.
#[derive(Debug)]
struct CodecRun {
    artifact: EncodedArtifact,
    encode: TimingSample,
    decode: TimingSample,
}

/// Runs every configured codec over one dataset.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    codecs: Vec<Box<dyn Codec>>,
    reporter: ComparisonReporter,
}

impl Harness {
    /// Build a harness, loading the schema if the binary format is selected.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Config`] for an unusable config, or a schema
    /// error if `schema_path` cannot be read or does not describe a batch.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.check()?;

        let schema = if config.formats.contains(&Format::Protobuf) {
            Some(match &config.schema_path {
                Some(path) => Schema::load(path)?,
                None => Schema::employees(),
            })
        } else {
            None
        };

        let codecs = config
            .formats
            .iter()
            .map(|format| codec_for(*format, schema.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let reporter = ComparisonReporter::new(&config.output_dir);
        Ok(Self {
            config,
            codecs,
            reporter,
        })
    }

    /// The configuration this harness was built from.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Codecs in configured format order.
    #[must_use]
    pub fn codecs(&self) -> &[Box<dyn Codec>] {
        &self.codecs
    }

    /// Build the configured dataset and run the comparison on it.
    ///
    /// # Errors
    ///
    /// Returns the first error from any codec, round-trip check, or artifact
    /// write. No partial report is produced.
    pub fn run(&self) -> Result<RunOutcome> {
        let batch = self.config.dataset.build();
        self.run_batch(&batch)
    }

    /// Run the comparison on an explicit batch.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_batch(&self, batch: &EmployeeBatch) -> Result<RunOutcome> {
        let span = tracing::info_span!("run", records = batch.len(), parallel = self.config.parallel);
        let _guard = span.enter();
        tracing::info!(formats = ?self.config.formats, "starting comparison");

        let verify = self.config.verify_round_trip;
        let runs = if self.config.parallel {
            self.codecs
                .par_iter()
                .map(|codec| run_codec(codec.as_ref(), batch, verify))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.codecs
                .iter()
                .map(|codec| run_codec(codec.as_ref(), batch, verify))
                .collect::<Result<Vec<_>>>()?
        };

        let mut artifacts = Vec::with_capacity(runs.len());
        let mut timings = Vec::with_capacity(runs.len() * 2);
        for run in runs {
            timings.push(run.encode);
            timings.push(run.decode);
            artifacts.push(run.artifact);
        }

        let report = self.reporter.report(&artifacts, timings)?;
        if let Some(path) = &self.config.json_report {
            report.write_json(path)?;
        }

        tracing::info!(
            reduction = ?report.binary_vs_json_reduction(),
            "comparison complete"
        );
        Ok(RunOutcome {
            records: batch.len(),
            report,
        })
    }
}

/// Codec for `format`. The binary codec needs `schema`.
///
/// # Errors
///
/// Returns [`CodecError::InvalidSchema`] if `format` is binary and the schema
/// is missing or lacks the `Employees` layout.
pub fn codec_for(format: Format, schema: Option<&Schema>) -> Result<Box<dyn Codec>> {
    Ok(match format {
        Format::Json => Box::new(JsonCodec::new()),
        Format::Xml => Box::new(XmlCodec::new()),
        Format::Protobuf => {
            let schema = schema.ok_or_else(|| {
                CodecError::InvalidSchema("no schema loaded for the binary format".to_string())
            })?;
            Box::new(ProtobufCodec::new(schema, ROOT_MESSAGE)?)
        },
    })
}

/// Check that `decoded` carries the same records as `original`.
///
/// Values compare numerically, so an integer that came back as an integral
/// float still matches.
///
/// # Errors
///
/// Returns [`CodecError::RoundTripMismatch`] with the index of the first
/// differing record.
pub fn verify_round_trip(
    format: Format,
    original: &EmployeeBatch,
    decoded: &EmployeeBatch,
) -> Result<()> {
    match original.first_difference(decoded) {
        Some(index) => Err(CodecError::RoundTripMismatch { format, index }),
        None => Ok(()),
    }
}

fn run_codec(codec: &dyn Codec, batch: &EmployeeBatch, verify: bool) -> Result<CodecRun> {
    let format = codec.format();
    let name = format.name();

    let (artifact, encode) =
        try_measure(&format!("{name} encode"), || codec.encode_artifact(batch))?;
    let (decoded, decode) = try_measure(&format!("{name} decode"), || codec.decode(artifact.bytes()))?;
    tracing::debug!(%format, bytes = artifact.len(), "codec finished");

    if verify {
        verify_round_trip(format, batch, &decoded)?;
    }

    Ok(CodecRun {
        artifact,
        encode,
        decode,
    })
}
