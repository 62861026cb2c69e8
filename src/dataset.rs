//! Dataset builders.
//!
//! [`build`] returns the fixed three-record sample every format is compared
//! on by default. [`generate`] produces larger batches from a seed, for runs
//! where three records are too few to say anything about size or speed.

use crate::record::{Employee, EmployeeBatch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// Names drawn by [`generate`].
const NAMES: [&str; 12] = [
    "Ali", "Kamal", "Amal", "Sara", "Youssef", "Nadia", "Omar", "Leila", "Hassan", "Imane",
    "Karim", "Salma",
];

/// Salary range used by [`generate`] (lower bound inclusive).
const SALARY_RANGE: std::ops::Range<i64> = 1_000..100_000;

/// The fixed sample batch.
///
/// # Examples
///
/// ```
/// let batch = codecmp::dataset::build();
/// assert_eq!(batch.len(), 3);
/// ```
#[must_use]
pub fn build() -> EmployeeBatch {
    EmployeeBatch::new(vec![
        Employee::new(1, "Ali", 9000),
        Employee::new(2, "Kamal", 22000),
        Employee::new(3, "Amal", 23000),
    ])
}

/// Generate `count` records deterministically from `seed`.
///
/// Ids run from 1 to `count`; names come from a fixed pool and salaries are
/// integers in `[1000, 100000)`.
#[must_use]
pub fn generate(count: usize, seed: u64) -> EmployeeBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=count)
        .map(|id| {
            let name = NAMES[rng.gen_range(0..NAMES.len())];
            let salary = rng.gen_range(SALARY_RANGE);
            Employee::new(i64::try_from(id).unwrap_or(i64::MAX), name, salary)
        })
        .collect()
}

/// Which dataset a run encodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatasetSpec {
    /// The fixed three-record sample from [`build`]
    #[default]
    Sample,
    /// A seeded batch from [`generate`]
    Generated {
        /// Number of records
        count: usize,
        /// Generator seed
        #[serde(default)]
        seed: u64,
    },
}

impl DatasetSpec {
    /// Build the selected batch.
    #[must_use]
    pub fn build(&self) -> EmployeeBatch {
        match self {
            Self::Sample => build(),
            Self::Generated { count, seed } => generate(*count, *seed),
        }
    }
}
