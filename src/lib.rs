#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # codecmp: serialization format comparison
//!
//! Encodes one batch of employee records as JSON, XML and schema-driven
//! Protocol Buffers, times every encode and decode, writes the artifacts to
//! disk and reports how the sizes compare.
//!
//! ## Quick Start
//!
//! ```
//! use codecmp::formats::Codec;
//! use codecmp::{JsonCodec, ProtobufCodec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let batch = codecmp::dataset::build();
//!
//! let json = JsonCodec::new().encode(&batch)?;
//! let binary = ProtobufCodec::with_default_schema()?.encode(&batch)?;
//! assert_eq!(json.len(), 127);
//! assert_eq!(binary.len(), 41);
//! # Ok(())
//! # }
//! ```
//!
//! ### Running a full comparison
//!
//! ```no_run
//! use codecmp::{Harness, HarnessConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig {
//!     output_dir: "out".into(),
//!     ..Default::default()
//! };
//! let outcome = Harness::new(config)?.run()?;
//! println!("{}", outcome.report);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`] — Employee records and batches
//! - [`dataset`] — The fixed sample batch and a seeded generator
//! - [`formats`] — The [`Codec`](formats::Codec) trait and [`Format`] enum
//! - [`json`] — JSON codec
//! - [`xml`] — Compact XML codec
//! - [`schema`] — `.proto` schema parsing
//! - [`validation`] — Batch validation against a schema
//! - [`protobuf`] — Schema-driven binary codec
//! - [`timing`] — Wall-clock measurement
//! - [`report`] — Artifact persistence and size comparison
//! - [`harness`] — The comparison run
//! - [`config`] — Run configuration
//! - [`error`] — Error types and result type

pub mod config;
pub mod dataset;
pub mod error;
/// Format enum and the codec trait.
///
/// See the [`formats`] module documentation for the supported formats.
pub mod formats;
pub mod harness;
pub mod json;
pub mod protobuf;
/// Employee records (`Employee`, `EmployeeBatch`, `FieldValue`)
pub mod record;
pub mod report;
pub mod schema;
pub mod timing;
pub mod validation;
pub mod xml;

pub use config::HarnessConfig;
pub use dataset::DatasetSpec;
pub use error::{CodecError, Result};
pub use formats::{Codec, EncodedArtifact, Format};
pub use harness::{Harness, RunOutcome};
pub use json::JsonCodec;
pub use protobuf::ProtobufCodec;
pub use record::{Employee, EmployeeBatch, FieldValue};
pub use report::{ArtifactSize, ComparisonReport, ComparisonReporter};
pub use schema::Schema;
pub use timing::{measure, try_measure, TimingSample};
pub use validation::SchemaValidator;
pub use xml::XmlCodec;
