//! Run report aggregation.
//!
//! [`ReportAggregator`] is the only state shared between workers. Scalar
//! counters are lock-free atomics so progress can be read cheaply from any
//! thread; the ordered result log sits behind its own mutex.
//!
//! `expected` grows while the run is in flight because nested archives are
//! only discovered once their parent is extracted. Progress can therefore
//! briefly read above 100% and settles once discovery catches up.

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Outcome of decompiling one class file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecompileResult {
    #[serde(rename = "className")]
    pub name: String,
    #[serde(rename = "packageName")]
    pub package: String,
    pub success: bool,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "timeTaken")]
    pub elapsed_seconds: f64,
    pub timestamp: DateTime<Local>,
}

/// Point-in-time copy of a run. `end_time` is only set on the copy returned
/// by [`ReportAggregator::finalize`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
    #[serde(rename = "totalFiles")]
    pub processed_count: u64,
    #[serde(rename = "expectedFiles")]
    pub expected_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub results: Vec<DecompileResult>,
}

impl Report {
    pub fn duration_seconds(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Local::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn success_rate(&self) -> f64 {
        if self.processed_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.processed_count as f64 * 100.0
    }
}

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} classes {msg}";

#[derive(Debug, Clone)]
pub enum ProgressMode {
    /// Live bar on stderr. Share the same bar with the log writer so log
    /// lines are printed above it instead of through it.
    Console(ProgressBar),
    Silent,
}

impl ProgressMode {
    /// A console bar with no expected work yet; its length grows with
    /// [`ReportAggregator::add_expected`].
    pub fn console() -> Self {
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self::Console(bar)
    }

    pub fn bar(&self) -> Option<&ProgressBar> {
        match self {
            Self::Console(bar) => Some(bar),
            Self::Silent => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: u64,
    pub expected: u64,
}

impl Progress {
    /// Not clamped: can exceed 100 while nested archives are still being
    /// discovered.
    pub fn percent(&self) -> f64 {
        if self.expected == 0 {
            return 0.0;
        }
        self.processed as f64 / self.expected as f64 * 100.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "progress: {:.1}% ({}/{})",
            self.percent(),
            self.processed,
            self.expected
        )
    }
}

#[derive(Debug)]
pub struct ReportAggregator {
    input_path: PathBuf,
    output_path: PathBuf,
    start_time: DateTime<Local>,
    processed: AtomicU64,
    expected: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    results: Mutex<Vec<DecompileResult>>,
    bar: Option<ProgressBar>,
}

impl ReportAggregator {
    pub fn new(input_path: &Path, output_path: &Path, progress_mode: ProgressMode) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            start_time: Local::now(),
            processed: AtomicU64::new(0),
            expected: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            results: Mutex::new(Vec::new()),
            bar: progress_mode.bar().cloned(),
        }
    }

    pub fn add_expected(&self, n: u64) {
        self.expected.fetch_add(n, Ordering::Relaxed);
        if let Some(bar) = &self.bar {
            bar.inc_length(n);
        }
    }

    pub fn record_result(&self, result: DecompileResult) {
        if result.success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }

        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);

        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(bar) = &self.bar {
            let progress = Progress {
                processed,
                expected: self.expected.load(Ordering::Relaxed),
            };
            bar.inc(1);
            bar.set_message(format!("{:.1}%", progress.percent()));
        }
    }

    /// Live counters, read without taking the results lock.
    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.processed.load(Ordering::Relaxed),
            expected: self.expected.load(Ordering::Relaxed),
        }
    }

    /// Counts are derived from the copied result log, so the snapshot always
    /// satisfies `success + failure == processed` even while workers append.
    pub fn snapshot(&self) -> Report {
        let results = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let success_count = results.iter().filter(|r| r.success).count() as u64;
        let processed_count = results.len() as u64;

        Report {
            input_path: self.input_path.clone(),
            output_path: self.output_path.clone(),
            start_time: self.start_time,
            end_time: None,
            processed_count,
            expected_count: self.expected.load(Ordering::Relaxed),
            success_count,
            failure_count: processed_count - success_count,
            results,
        }
    }

    /// Stamps the end time. Consumes the aggregator, so it can only happen
    /// once and only after every worker has released its borrow.
    pub fn finalize(self) -> Report {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }

        let results = self
            .results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        Report {
            input_path: self.input_path,
            output_path: self.output_path,
            start_time: self.start_time,
            end_time: Some(Local::now()),
            processed_count: self.processed.into_inner(),
            expected_count: self.expected.into_inner(),
            success_count: self.success.into_inner(),
            failure_count: self.failure.into_inner(),
            results,
        }
    }
}
