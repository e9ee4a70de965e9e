//! One complete run: classify → dispatch → post-process → finalize → render.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cfr::Decompiler;
use crate::dispatch::{DispatchOptions, Dispatcher, Input};
use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::render::{ReportFiles, write_reports};
use crate::report::{ProgressMode, Report, ReportAggregator};
use crate::unicode::{UnicodeStats, process_tree};

pub const REPORTS_DIR: &str = "reports";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub workers: usize,
    pub filter: FilterConfig,
    pub copy_resources: bool,
    pub progress: ProgressMode,
    pub scratch_root: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            workers: num_cpus::get(),
            filter: FilterConfig::default(),
            copy_resources: false,
            progress: ProgressMode::Silent,
            scratch_root: None,
        }
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.output.join(REPORTS_DIR)
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub unicode: UnicodeStats,
    /// `None` if writing the report files failed; the failure is logged.
    pub report_files: Option<ReportFiles>,
    /// Extraction or scan failure of the top-level input. The report still
    /// holds every result recorded before it happened.
    pub error: Option<Error>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs one batch. Only configuration errors are returned as `Err`; anything
/// later ends up in the returned outcome so a report is always produced.
pub fn run<D: Decompiler + ?Sized>(config: &RunConfig, decompiler: &D) -> Result<RunOutcome> {
    let input = Input::classify(&config.input)?;
    create_output_dir(&config.output)?;

    info!(
        "decompiling {} {} into {} with {} worker(s)",
        input.kind_label(),
        config.input.display(),
        config.output.display(),
        config.workers.max(1)
    );

    let report = ReportAggregator::new(&config.input, &config.output, config.progress.clone());
    let options = DispatchOptions {
        workers: config.workers,
        copy_resources: config.copy_resources,
        scratch_root: config.scratch_root.clone(),
    };
    let error = Dispatcher::new(decompiler, &config.filter, &report, options)
        .process(&input, &config.output)
        .err();
    if let Some(err) = &error {
        warn!("processing stopped early: {err}");
    }

    let unicode = process_tree(&config.output);
    if unicode.modified > 0 {
        info!(
            "decoded unicode escapes in {}/{} source file(s)",
            unicode.modified, unicode.visited
        );
    }

    let report = report.finalize();
    let report_files = match write_reports(&report, &config.reports_dir()) {
        Ok(files) => Some(files),
        Err(err) => {
            warn!("failed to write reports: {err:#}");
            None
        }
    };

    Ok(RunOutcome {
        report,
        unicode,
        report_files,
        error,
    })
}

fn create_output_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| Error::OutputDir {
        path: path.to_path_buf(),
        source,
    })
}
