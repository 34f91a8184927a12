use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::answer_key::AnswerKey;
use crate::config::MarksheetConfig;
use crate::detection::build_standard_pipeline;
use crate::error::{BatchError, SheetError};
use crate::models::{SheetFailure, SheetResult};
use crate::pipeline::{Pipeline, SheetContext};
use crate::preview;

/// Cooperative stop signal shared between a batch and whoever may cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sheets already running finish; no further sheet is started.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a batch: successes in input order plus every recorded failure.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<SheetResult>,
    pub failures: Vec<SheetFailure>,
    /// Set when the batch stopped early on a cancellation request
    pub cancelled: bool,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} of {} sheets processed, {} failed",
            self.results.len(),
            self.attempted(),
            self.failures.len()
        );
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }
}

/// Fans sheets out across blocking workers and collects them back in order.
#[derive(Clone)]
pub struct BatchRunner {
    pipeline: Pipeline,
    extensions: Vec<String>,
    workers: usize,
    preview_dir: Option<PathBuf>,
    cancel: CancelFlag,
}

impl BatchRunner {
    pub fn new(config: &MarksheetConfig, key: Arc<AnswerKey>) -> Self {
        Self {
            pipeline: build_standard_pipeline(config, key),
            extensions: config.batch.extensions.clone(),
            workers: config.batch.worker_count(),
            preview_dir: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Replace the decoding pipeline, e.g. with one that writes debug images
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Write an annotated copy of every successful sheet into `dir`
    pub fn with_preview_dir(mut self, dir: PathBuf) -> Self {
        self.preview_dir = Some(dir);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process every matching file in `dir`.
    pub async fn run(&self, dir: &Path) -> Result<BatchReport, BatchError> {
        let paths = collect_sheets(dir, &self.extensions)?;
        info!("Found {} sheets in {}", paths.len(), dir.display());
        self.run_paths(paths).await
    }

    /// Process the given files. Results keep the order of `paths`.
    pub async fn run_paths(&self, paths: Vec<PathBuf>) -> Result<BatchReport, BatchError> {
        if let Some(dir) = &self.preview_dir {
            std::fs::create_dir_all(dir)?;
        }

        let semaphore = Arc::new(Semaphore::new(self.workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut outcomes: Vec<Option<Result<SheetResult, SheetFailure>>> =
            (0..paths.len()).map(|_| None).collect();
        let mut cancelled = false;

        for (index, path) in paths.into_iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let pipeline = self.pipeline.clone();
            let preview_dir = self.preview_dir.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    process_sheet(&pipeline, &path, preview_dir.as_deref())
                }))
                .unwrap_or_else(|payload| {
                    let source = source_name(&path);
                    let error = SheetError::Worker(panic_message(payload.as_ref()));
                    warn!("{}: {}", source, error);
                    Err(SheetFailure { source, error })
                });
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined?;
            outcomes[index] = Some(outcome);
        }

        let mut report = BatchReport {
            cancelled,
            ..BatchReport::default()
        };
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(failure) => report.failures.push(failure),
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }
}

/// Validate-then-run convenience: the key is already checked by the time it
/// gets here, so every sheet is scored against a well-formed key.
pub async fn run_batch(
    dir: &Path,
    config: &MarksheetConfig,
    key: Arc<AnswerKey>,
) -> Result<BatchReport, BatchError> {
    BatchRunner::new(config, key).run(dir).await
}

/// Files directly inside `dir` whose extension is one of `extensions`
/// (case-sensitive), sorted by file name.
pub fn collect_sheets(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, BatchError> {
    let entries = std::fs::read_dir(dir).map_err(|source| BatchError::InputDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
        })
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Run one sheet end to end, turning any error into a recorded failure.
pub fn process_sheet(
    pipeline: &Pipeline,
    path: &Path,
    preview_dir: Option<&Path>,
) -> Result<SheetResult, SheetFailure> {
    let source = source_name(path);

    match decode_sheet(pipeline, path, preview_dir) {
        Ok(result) => {
            info!("{}: number {} score {}", result.source, result.number, result.score);
            Ok(result)
        }
        Err(error) => {
            warn!("{}: {}", source, error);
            Err(SheetFailure { source, error })
        }
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn decode_sheet(
    pipeline: &Pipeline,
    path: &Path,
    preview_dir: Option<&Path>,
) -> Result<SheetResult, SheetError> {
    let sheet = pipeline.run(SheetContext::open(path)?)?;

    if let (Some(dir), Some(decoded), Some(score)) = (preview_dir, &sheet.decoded, sheet.score) {
        let annotated = preview::render_answer_preview(&sheet.original, decoded);
        let name = preview::preview_file_name(&decoded.number, score, &sheet.source);
        preview::write_preview(&dir.join(name), &annotated)?;
    }

    sheet.into_result()
}

/// `number,score` header, then one row per result.
pub fn write_results_csv<W: Write>(mut writer: W, results: &[SheetResult]) -> std::io::Result<()> {
    writeln!(writer, "number,score")?;
    for result in results {
        writeln!(writer, "{},{}", result.number, result.score)?;
    }
    writer.flush()
}
