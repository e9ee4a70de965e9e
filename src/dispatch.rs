//! Per-input state machine and worker pool.
//!
//! Archives go through extract → scan → account → recurse → dispatch. Nested
//! library jars are handled one at a time, each fully drained (including its
//! own worker pool) before the next starts, so at most one scratch directory
//! per recursion level exists at any moment. Class files inside one batch are
//! decompiled by a fixed set of consumers in no particular order.

use chrono::Local;
use crossbeam::channel;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cfr::Decompiler;
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::filter::{
    FilterConfig, class_match_path, class_relative_path, package_path, path_to_slash,
};
use crate::report::{DecompileResult, ReportAggregator};
use crate::scan::{scan_extracted, scan_tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Jar,
    War,
}

impl ArchiveKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Jar => "JAR",
            Self::War => "WAR",
        }
    }
}

/// A top-level input, classified once by [`Input::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Class(PathBuf),
    Archive(ArchiveKind, PathBuf),
    Directory(PathBuf),
}

impl Input {
    pub fn classify(path: &Path) -> Result<Self> {
        let meta =
            std::fs::metadata(path).map_err(|_| Error::MissingInput(path.to_path_buf()))?;
        if meta.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("class") => Ok(Self::Class(path.to_path_buf())),
            Some("jar") => Ok(Self::Archive(ArchiveKind::Jar, path.to_path_buf())),
            Some("war") => Ok(Self::Archive(ArchiveKind::War, path.to_path_buf())),
            _ => Err(Error::UnsupportedInput(path.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Class(p) | Self::Archive(_, p) | Self::Directory(p) => p,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Class(_) => "class",
            Self::Archive(kind, _) => kind.label(),
            Self::Directory(_) => "directory",
        }
    }
}

/// One class file queued for decompilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Slash path the filter matched: relative to the walked root, or the
    /// full path when it carries a classes root marker.
    pub relative: String,
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub workers: usize,
    pub copy_resources: bool,
    /// Parent directory for per-archive scratch directories; the system temp
    /// directory when `None`.
    pub scratch_root: Option<PathBuf>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            copy_resources: false,
            scratch_root: None,
        }
    }
}

pub struct Dispatcher<'a, D: Decompiler + ?Sized> {
    decompiler: &'a D,
    filter: &'a FilterConfig,
    report: &'a ReportAggregator,
    options: DispatchOptions,
}

impl<'a, D: Decompiler + ?Sized> Dispatcher<'a, D> {
    pub fn new(
        decompiler: &'a D,
        filter: &'a FilterConfig,
        report: &'a ReportAggregator,
        options: DispatchOptions,
    ) -> Self {
        Self {
            decompiler,
            filter,
            report,
            options,
        }
    }

    pub fn process(&self, input: &Input, output_dir: &Path) -> Result<()> {
        match input {
            Input::Class(path) => {
                self.report.add_expected(1);
                let relative = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.decompile_item(&WorkItem {
                    input: path.clone(),
                    output_dir: output_dir.to_path_buf(),
                    relative,
                });
                Ok(())
            }
            Input::Archive(kind, path) => self.process_archive(*kind, path, output_dir),
            Input::Directory(path) => self.process_directory(path, output_dir),
        }
    }

    fn process_archive(&self, kind: ArchiveKind, archive: &Path, output_dir: &Path) -> Result<()> {
        info!("processing {} {}", kind.label(), archive.display());

        let scratch = self.scratch_dir(archive)?;
        let root = scratch.path();
        let files = extract(archive, root)?;
        debug!("extracted {files} entries from {}", archive.display());

        let scan = scan_extracted(root)?;
        if self.options.copy_resources && !scan.resources.is_empty() {
            self.copy_resources(root, &scan.resources, output_dir);
        }

        let items = self.filter_classes(root, &scan.classes, output_dir);
        self.report.add_expected(items.len() as u64);

        for nested in &scan.jars {
            if !self.filter.should_process_jar(&path_to_slash(nested)) {
                debug!("skipping library jar {}", display_name(nested));
                continue;
            }
            info!("entering nested jar {}", display_name(nested));
            if let Err(err) = self.process_archive(ArchiveKind::Jar, nested, output_dir) {
                warn!("nested jar {} failed: {err}", display_name(nested));
            }
        }

        self.dispatch(items)
    }

    fn process_directory(&self, dir: &Path, output_dir: &Path) -> Result<()> {
        info!("processing directory {}", dir.display());

        let scan = scan_tree(dir, output_dir)?;
        info!(
            "found {} jar(s), {} war(s), {} class file(s)",
            scan.jars.len(),
            scan.wars.len(),
            scan.classes.len()
        );
        if scan.is_empty() {
            warn!("nothing to decompile under {}", dir.display());
            return Ok(());
        }

        let items = self.filter_classes(dir, &scan.classes, output_dir);
        self.report.add_expected(items.len() as u64);

        let archives = scan
            .jars
            .iter()
            .map(|p| (ArchiveKind::Jar, p))
            .chain(scan.wars.iter().map(|p| (ArchiveKind::War, p)));
        for (kind, archive) in archives {
            if !self.filter.should_process_jar(&path_to_slash(archive)) {
                debug!("skipping library archive {}", display_name(archive));
                continue;
            }
            if let Err(err) = self.process_archive(kind, archive, output_dir) {
                warn!("{} {} failed: {err}", kind.label(), display_name(archive));
            }
        }

        self.dispatch(items)
    }

    fn filter_classes(&self, root: &Path, classes: &[PathBuf], output_dir: &Path) -> Vec<WorkItem> {
        let items: Vec<WorkItem> = classes
            .iter()
            .filter_map(|class| {
                let relative = class_match_path(root, class);
                self.filter
                    .should_process_class(&relative)
                    .then(|| WorkItem {
                        input: class.clone(),
                        output_dir: output_dir.to_path_buf(),
                        relative,
                    })
            })
            .collect();

        if items.len() != classes.len() {
            info!("filtered: {}/{} class files in scope", items.len(), classes.len());
        }
        items
    }

    /// Fans `items` out to exactly `workers` consumers and returns once every
    /// consumer has drained the queue.
    fn dispatch(&self, items: Vec<WorkItem>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let workers = self.options.workers.max(1);
        let (tx, rx) = channel::bounded::<WorkItem>(items.len());
        for item in items {
            if tx.send(item).is_err() {
                break;
            }
        }
        drop(tx);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("decompile-{i}"))
            .build()?;
        pool.scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                scope.spawn(move |_| {
                    for item in rx.iter() {
                        self.decompile_item(&item);
                    }
                });
            }
        });
        Ok(())
    }

    fn decompile_item(&self, item: &WorkItem) {
        let timestamp = Local::now();
        let started = Instant::now();
        let outcome = self.decompiler.decompile(&item.input, &item.output_dir);

        let name = display_name(&item.input);
        let error_message = match &outcome {
            Ok(()) => {
                debug!("decompiled {name}");
                None
            }
            Err(err) => {
                debug!("failed to decompile {name}: {err:#}");
                Some(format!("decompile failed: {err:#}"))
            }
        };

        self.report.record_result(DecompileResult {
            name,
            package: package_path(&item.relative),
            success: outcome.is_ok(),
            error_message,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            timestamp,
        });
    }

    fn scratch_dir(&self, archive: &Path) -> Result<tempfile::TempDir> {
        let stem = archive
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());
        let prefix = format!("decompile-{stem}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.options.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(Error::Scratch)
    }

    /// Best effort: a failed copy is logged and skipped.
    fn copy_resources(&self, root: &Path, resources: &[PathBuf], output_dir: &Path) {
        let mut copied = 0usize;
        for resource in resources {
            let relative = path_to_slash(resource.strip_prefix(root).unwrap_or(resource));
            let dest = output_dir
                .join("resources")
                .join(class_relative_path(&relative));
            let result = dest
                .parent()
                .map_or(Ok(()), std::fs::create_dir_all)
                .and_then(|()| std::fs::copy(resource, &dest));
            match result {
                Ok(_) => copied += 1,
                Err(err) => warn!("failed to copy resource {relative}: {err}"),
            }
        }
        if copied > 0 {
            info!("copied {copied} resource file(s)");
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
