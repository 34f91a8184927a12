use std::path::PathBuf;

use thiserror::Error;

use crate::models::Axis;

/// Failures confined to a single sheet. The batch records them and moves on.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Expected {expected} {axis} markers, best strip had {observed}")]
    MarkerCount {
        axis: Axis,
        expected: usize,
        observed: usize,
    },

    #[error("Decoded {actual} answer rows but the answer key has {expected}")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("Step '{step}' requires {requires} from an earlier step")]
    MissingStage {
        step: &'static str,
        requires: &'static str,
    },

    #[error("Failed to write preview '{path}': {reason}")]
    Preview { path: PathBuf, reason: String },

    #[error("Worker panicked: {0}")]
    Worker(String),
}

impl SheetError {
    /// Short machine-friendly tag used in failure summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            SheetError::InvalidRaster(_) => "invalid_raster",
            SheetError::MarkerCount { .. } => "marker_count",
            SheetError::RowCountMismatch { .. } => "row_count_mismatch",
            SheetError::MissingStage { .. } => "missing_stage",
            SheetError::Preview { .. } => "preview",
            SheetError::Worker(_) => "worker",
        }
    }
}

/// The answer key is shared by every sheet, so any of these aborts the batch.
#[derive(Error, Debug)]
pub enum AnswerKeyError {
    #[error("Answer key must have {expected} question rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("Answer key row {row} must have {expected} option columns, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Failed to read answer key: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed answer key: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    AnswerKey(#[from] AnswerKeyError),

    #[error("Cannot read input directory '{path}': {source}")]
    InputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write batch results: {0}")]
    Output(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
