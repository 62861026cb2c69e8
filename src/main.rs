//!
//! The `codecmp` command line.
//!

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use codecmp::{DatasetSpec, Format, Harness, HarnessConfig};
use tracing_subscriber::EnvFilter;

///
/// Compare JSON, XML and Protocol Buffers on one batch of employee records.
///
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Arguments {
    /// TOML configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the `data.*` artifacts are written to.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Generate this many records instead of using the sample batch.
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Seed for generated records (default 0).
    #[arg(long, requires = "count")]
    seed: Option<u64>,

    /// `.proto` schema for the binary format.
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Format to compare: `json`, `xml` or `protobuf`. Repeat to select several.
    #[arg(short, long = "format")]
    formats: Vec<Format>,

    /// Run the formats in parallel.
    #[arg(long)]
    parallel: bool,

    /// Skip the decoded-equals-input check.
    #[arg(long)]
    no_verify: bool,

    /// Also write the report as JSON.
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// Log more; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppresses the terminal report.
    #[arg(short, long)]
    quiet: bool,
}

impl Arguments {
    /// Merge the flags over the file configuration.
    fn into_config(self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(count) = self.count {
            config.dataset = DatasetSpec::Generated {
                count,
                seed: self.seed.unwrap_or_default(),
            };
        }
        if self.schema.is_some() {
            config.schema_path = self.schema;
        }
        if !self.formats.is_empty() {
            config.formats = self.formats;
        }
        config.parallel |= self.parallel;
        if self.no_verify {
            config.verify_round_trip = false;
        }
        if self.json_report.is_some() {
            config.json_report = self.json_report;
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("codecmp={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let arguments = Arguments::parse();
    init_logging(arguments.verbose);

    let quiet = arguments.quiet;
    let config = arguments.into_config()?;
    let harness = Harness::new(config).context("setting up the comparison")?;
    let outcome = harness.run().context("comparison run failed")?;

    if !quiet {
        println!("{}", outcome.report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("codecmp.toml");
        std::fs::write(
            &path,
            r#"
            output_dir = "from-file"
            formats = ["xml"]
            verify_round_trip = true
            json_report = "file-report.json"

            [dataset]
            kind = "generated"
            count = 5
            seed = 1
            "#,
        )
        .unwrap();
        path
    }

    #[test]
    fn test_config_file_values_without_flags() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);
        let config = Arguments::try_parse_from(["codecmp", "--config", path.to_str().unwrap()])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("from-file"));
        assert_eq!(config.formats, vec![Format::Xml]);
        assert_eq!(config.dataset, DatasetSpec::Generated { count: 5, seed: 1 });
        assert!(config.verify_round_trip);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = config_file(&dir);
        let config = Arguments::try_parse_from([
            "codecmp",
            "--config",
            path.to_str().unwrap(),
            "--output-dir",
            "from-flag",
            "--format",
            "json",
            "--format",
            "protobuf",
            "--count",
            "100",
            "--seed",
            "9",
            "--no-verify",
            "--parallel",
        ])
        .unwrap()
        .into_config()
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("from-flag"));
        assert_eq!(config.formats, vec![Format::Json, Format::Protobuf]);
        assert_eq!(config.dataset, DatasetSpec::Generated { count: 100, seed: 9 });
        assert!(!config.verify_round_trip);
        assert!(config.parallel);
        // Not given on the command line, so the file value stands
        assert_eq!(config.json_report, Some(PathBuf::from("file-report.json")));
    }

    #[test]
    fn test_count_without_seed_uses_zero() {
        let config = Arguments::try_parse_from(["codecmp", "-n", "7"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.dataset, DatasetSpec::Generated { count: 7, seed: 0 });
    }

    #[test]
    fn test_seed_requires_count() {
        let err = Arguments::try_parse_from(["codecmp", "--seed", "3"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Arguments::try_parse_from(["codecmp", "--format", "yaml"]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        let result = Arguments::try_parse_from(["codecmp", "--config", missing.to_str().unwrap()])
            .unwrap()
            .into_config();
        assert!(result.is_err());
    }
}
