//! Error type for the archive-processing core.
//!
//! Only configuration problems and archive-level failures (extraction, scan)
//! surface as [`Error`]. Per-class decompile failures are data in the report
//! and post-processing failures are swallowed, so neither appears here.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input path does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("unsupported input type: {} (expected a directory, .jar, .war or .class)", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open archive {}: {source}", path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive {}: {source}", path.display())]
    ReadArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry whose stored name resolves outside the extraction directory.
    #[error("illegal entry path {entry:?} in {}", archive.display())]
    ZipSlip { archive: PathBuf, entry: String },

    #[error("failed to extract {entry:?} from {}: {source}", archive.display())]
    ExtractEntry {
        archive: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Returns `true` for errors raised before any work starts (bad input or
    /// output location), as opposed to failures while processing an archive.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingInput(_) | Self::UnsupportedInput(_) | Self::OutputDir { .. }
        )
    }

    pub(crate) fn entry(archive: &std::path::Path, entry: &str, source: std::io::Error) -> Self {
        Self::ExtractEntry {
            archive: archive.to_path_buf(),
            entry: entry.to_string(),
            source,
        }
    }
}
