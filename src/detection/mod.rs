pub mod preprocessing;
pub mod contours;
pub mod markers;
pub mod grid;
pub mod scoring;
pub mod steps;

use std::sync::Arc;

use crate::answer_key::AnswerKey;
use crate::config::MarksheetConfig;
use crate::pipeline::Pipeline;

/// Build the standard decoding pipeline: binarize, track markers, decode the
/// grid, then score against `key`.
pub fn build_standard_pipeline(config: &MarksheetConfig, key: Arc<AnswerKey>) -> Pipeline {
    use crate::detection::steps::*;

    Pipeline::new()
        .add_step(Arc::new(BinarizeStep {
            thresholds: config.thresholds,
        }))
        .add_step(Arc::new(MarkerTrackingStep {
            layout: config.layout,
            tracker: config.tracker,
        }))
        .add_step(Arc::new(GridDecodeStep {
            layout: config.layout,
        }))
        .add_step(Arc::new(ScoreStep { key }))
}
