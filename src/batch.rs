//! Batch conversion of SVG files into PNG files.
//!
//! A [`BatchRasterizer`] owns one [`Engine`] for the whole run and pushes
//! every [`ConversionJob`] through it in order. A failing job is recorded in
//! the [`RunSummary`] and the loop moves on; only problems that make the
//! whole run impossible (missing input, unwritable output root) surface as
//! `Err`.

use crate::render::render;
use crate::viewbox::infer_dimensions;
use crate::{Engine, Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Extension of the files picked up by batch mode
pub const SVG_EXTENSION: &str = "svg";
/// Extension substituted on output files
pub const PNG_EXTENSION: &str = "png";
/// Directory created next to the input directory when no output is given
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "png_output";

/// One source-to-destination conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl ConversionJob {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// File name of the source, as shown in progress lines and failure lists
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Outcome of a single [`ConversionJob`]
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub job: ConversionJob,
    /// `None` on success, otherwise the message of the error that stopped the job
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counts for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success_count: usize,
    pub fail_count: usize,
    /// `(file name, error message)` in the order the failures happened
    pub failures: Vec<(String, String)>,
}

impl RunSummary {
    pub fn record(&mut self, result: &ConversionResult) {
        match &result.error {
            None => self.success_count += 1,
            Some(msg) => {
                self.fail_count += 1;
                self.failures.push((result.job.file_name(), msg.clone()));
            }
        }
    }

    /// Number of jobs processed so far
    pub fn total(&self) -> usize {
        self.success_count + self.fail_count
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Per-run rasterization options
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Output density multiplier applied in CSS pixels
    pub scale: f64,
    /// Descend into subdirectories in batch mode
    pub recursive: bool,
    /// Bound on waiting for the `<svg>` element after loading, in milliseconds
    pub selector_timeout_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            recursive: true,
            selector_timeout_ms: 5000,
        }
    }
}

impl BatchOptions {
    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::ConfigError(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

/// Observer for batch progress. Every method defaults to a no-op.
pub trait BatchProgress {
    /// Called once the jobs are known, before the first one runs
    fn on_batch_start(&self, total: usize, output_dir: &Path) {
        let _ = (total, output_dir);
    }

    /// Called before a job starts; `index` is 1-based
    fn on_job_start(&self, index: usize, total: usize, job: &ConversionJob) {
        let _ = (index, total, job);
    }

    /// Called after a job finished, successfully or not
    fn on_job_complete(&self, index: usize, total: usize, result: &ConversionResult) {
        let _ = (index, total, result);
    }
}

struct Silent;

impl BatchProgress for Silent {}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(SVG_EXTENSION))
        .unwrap_or(false)
}

/// List the SVG files under `root`, sorted so that runs are reproducible.
///
/// Unreadable directory entries are logged and skipped. An empty result is
/// not an error.
pub fn enumerate(root: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_svg(e.path()))
        .map(|e| e.into_path())
        .collect::<Vec<_>>();
    files.sort();
    files
}

/// `<parent of input_dir>/png_output`
///
/// Inputs without a final component (such as `.`) are resolved through
/// their canonical path first.
pub fn default_output_dir(input_dir: &Path) -> PathBuf {
    match (input_dir.parent(), input_dir.file_name()) {
        (Some(parent), Some(_)) => parent.join(DEFAULT_OUTPUT_DIR_NAME),
        _ => fs::canonicalize(input_dir)
            .ok()
            .and_then(|abs| abs.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| input_dir.to_path_buf())
            .join(DEFAULT_OUTPUT_DIR_NAME),
    }
}

/// Jobs for every SVG under `input_dir`, mirroring its layout under `output_dir`
pub fn batch_jobs(input_dir: &Path, output_dir: &Path, recursive: bool) -> Vec<ConversionJob> {
    enumerate(input_dir, recursive)
        .into_iter()
        .map(|source| {
            let rel = source
                .strip_prefix(input_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| source.file_name().map(PathBuf::from).unwrap_or_default());
            let destination = output_dir.join(rel).with_extension(PNG_EXTENSION);
            ConversionJob { source, destination }
        })
        .collect()
}

/// Validate a single-file request and build its job.
///
/// The destination defaults to the source path with a `.png` extension.
pub fn single_job(source: &Path, destination: Option<&Path>) -> Result<ConversionJob> {
    if !source.exists() {
        return Err(Error::NotFound(source.to_path_buf()));
    }
    if !is_svg(source) {
        return Err(Error::InvalidInput(format!(
            "not an SVG file: '{}'",
            source.display()
        )));
    }
    let destination = destination
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source.with_extension(PNG_EXTENSION));
    Ok(ConversionJob::new(source, destination))
}

/// Sequential SVG-to-PNG converter bound to one engine for its lifetime
///
/// The engine is released by [`BatchRasterizer::close`], or by `Drop` if the
/// rasterizer goes away on another path.
pub struct BatchRasterizer<E: Engine> {
    engine: E,
    options: BatchOptions,
    summary: RunSummary,
    progress: Box<dyn BatchProgress>,
}

impl<E: Engine> BatchRasterizer<E> {
    pub fn new(engine: E, options: BatchOptions) -> Self {
        Self {
            engine,
            options,
            summary: RunSummary::default(),
            progress: Box::new(Silent),
        }
    }

    /// Report progress to `progress` instead of discarding it
    pub fn with_progress(mut self, progress: Box<dyn BatchProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run one job. Never fails: errors are folded into the returned result
    /// and counted in the summary.
    pub fn convert_one(&mut self, job: ConversionJob) -> ConversionResult {
        let error = match self.try_convert(&job) {
            Ok(()) => {
                debug!("wrote {}", job.destination.display());
                None
            }
            Err(err) => {
                debug!("{} failed: {}", job.source.display(), err);
                Some(err.to_string())
            }
        };
        let result = ConversionResult { job, error };
        self.summary.record(&result);
        result
    }

    fn try_convert(&mut self, job: &ConversionJob) -> Result<()> {
        if let Some(parent) = job.destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let markup = fs::read_to_string(&job.source).map_err(|e| Error::io(&job.source, e))?;
        let dims = infer_dimensions(&markup);
        let png = render(
            &mut self.engine,
            &markup,
            dims,
            self.options.scale,
            self.options.selector_timeout(),
        )?;

        fs::write(&job.destination, png).map_err(|e| Error::io(&job.destination, e))
    }

    /// Convert one file, validating it first (see [`single_job`])
    pub fn convert_single(
        &mut self,
        source: &Path,
        destination: Option<&Path>,
    ) -> Result<ConversionResult> {
        let job = single_job(source, destination)?;
        self.progress.on_job_start(1, 1, &job);
        let result = self.convert_one(job);
        self.progress.on_job_complete(1, 1, &result);
        Ok(result)
    }

    /// Convert every SVG under `input_dir` into `output_dir` (default:
    /// [`default_output_dir`]), preserving relative subpaths.
    pub fn convert_batch(
        &mut self,
        input_dir: &Path,
        output_dir: Option<&Path>,
    ) -> Result<&RunSummary> {
        if !input_dir.exists() {
            return Err(Error::NotFound(input_dir.to_path_buf()));
        }
        if !input_dir.is_dir() {
            return Err(Error::InvalidInput(format!(
                "not a directory: '{}'",
                input_dir.display()
            )));
        }

        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_dir(input_dir));
        fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;

        let jobs = batch_jobs(input_dir, &output_dir, self.options.recursive);
        let total = jobs.len();
        debug!(
            "{} job(s) from {} into {}",
            total,
            input_dir.display(),
            output_dir.display()
        );
        self.progress.on_batch_start(total, &output_dir);

        for (i, job) in jobs.into_iter().enumerate() {
            self.progress.on_job_start(i + 1, total, &job);
            let result = self.convert_one(job);
            self.progress.on_job_complete(i + 1, total, &result);
        }

        Ok(&self.summary)
    }

    /// Release the engine
    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}
