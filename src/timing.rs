//! Wall-clock timing of single encode/decode calls.
//!
//! Timing is an explicit return value: [`measure`] hands back the operation's
//! result together with a [`TimingSample`], so callers can print, compare or
//! export durations.
//!
//! # Examples
//!
//! ```
//! use codecmp::timing::measure;
//!
//! let (sum, sample) = measure("sum", || (1..=10).sum::<u32>());
//! assert_eq!(sum, 55);
//! assert_eq!(sample.label(), "sum");
//! ```

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};

/// The duration of one labelled operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingSample {
    label: String,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    duration: Duration,
}

impl TimingSample {
    /// Create a sample.
    #[must_use]
    pub fn new(label: impl Into<String>, duration: Duration) -> Self {
        Self {
            label: label.into(),
            duration,
        }
    }

    /// Operation label, e.g. `JSON encode`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Elapsed wall-clock time.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Elapsed time in fractional milliseconds.
    #[must_use]
    pub fn millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

impl fmt::Display for TimingSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.3}ms", self.label, self.millis())
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Run `operation`, returning its result and how long it took.
pub fn measure<T>(label: &str, operation: impl FnOnce() -> T) -> (T, TimingSample) {
    let start = Instant::now();
    let result = operation();
    let sample = TimingSample::new(label, start.elapsed());
    tracing::trace!(label, elapsed_ms = sample.millis(), "measured");
    (result, sample)
}

/// Run a fallible `operation`, returning its value and timing on success.
///
/// On failure the error propagates unchanged and no sample is produced; the
/// elapsed time of the failed call is only logged at debug level.
///
/// # Errors
///
/// Returns whatever error `operation` returns.
pub fn try_measure<T, E>(
    label: &str,
    operation: impl FnOnce() -> Result<T, E>,
) -> Result<(T, TimingSample), E> {
    let (result, sample) = measure(label, operation);
    match result {
        Ok(value) => Ok((value, sample)),
        Err(error) => {
            tracing::debug!(label, elapsed_ms = sample.millis(), "operation failed");
            Err(error)
        },
    }
}
