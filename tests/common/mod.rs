//! Common test helpers shared across the integration suites.

use codecmp::{Employee, EmployeeBatch, HarnessConfig};
use std::path::Path;
use tempfile::TempDir;

/// The three-record sample batch, spelled out.
pub fn sample_batch() -> EmployeeBatch {
    EmployeeBatch::new(vec![
        Employee::new(1, "Ali", 9000),
        Employee::new(2, "Kamal", 22000),
        Employee::new(3, "Amal", 23000),
    ])
}

/// Default configuration writing into `dir`.
pub fn config_in(dir: &TempDir) -> HarnessConfig {
    HarnessConfig {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

/// Length of a file in bytes.
#[allow(dead_code)]
pub fn file_len(path: impl AsRef<Path>) -> u64 {
    std::fs::metadata(path.as_ref())
        .unwrap_or_else(|e| panic!("no file at {}: {e}", path.as_ref().display()))
        .len()
}

/// The shipped schema file.
#[allow(dead_code)]
pub fn shipped_schema_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/proto/employee.proto"))
}
