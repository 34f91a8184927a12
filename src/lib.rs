pub mod answer_key;
pub mod batch;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preview;

pub use answer_key::AnswerKey;
pub use batch::{run_batch, BatchReport, BatchRunner, CancelFlag};
pub use config::MarksheetConfig;
pub use detection::build_standard_pipeline;
pub use error::{AnswerKeyError, BatchError, SheetError};
pub use models::{
    AnswerMatrix, AnswerRow, Axis, DecodedSheet, MarkerPoint, MarkerSequence, Markers,
    SheetFailure, SheetResult,
};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, PipelineStep, SheetContext};
