use std::sync::Arc;

use image::DynamicImage;

use crate::answer_key::AnswerKey;
use crate::config::{SheetLayout, ThresholdConfig, TrackerConfig};
use crate::detection::{grid, markers, preprocessing, scoring};
use crate::error::SheetError;
use crate::pipeline::{PipelineContext, PipelineStep, SheetContext};
use crate::preview;

/// Threshold the grayscale raster for the marker pass and the bubble pass
pub struct BinarizeStep {
    pub thresholds: ThresholdConfig,
}

impl PipelineStep for BinarizeStep {
    fn process(&self, sheet: &mut SheetContext, _context: &PipelineContext) -> Result<(), SheetError> {
        let marker_bitmap = preprocessing::binarize(&sheet.gray, self.thresholds.marker)?;
        let answer_bitmap = if self.thresholds.answer == self.thresholds.marker {
            marker_bitmap.clone()
        } else {
            preprocessing::binarize(&sheet.gray, self.thresholds.answer)?
        };

        sheet.marker_bitmap = Some(marker_bitmap);
        sheet.answer_bitmap = Some(answer_bitmap);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Binarize"
    }

    fn debug_image(&self, sheet: &SheetContext) -> Option<DynamicImage> {
        let bitmap = sheet.answer_bitmap.as_ref()?;
        Some(DynamicImage::ImageLuma8(bitmap.as_image().clone()))
    }
}

/// Locate the bottom and right calibration markers
pub struct MarkerTrackingStep {
    pub layout: SheetLayout,
    pub tracker: TrackerConfig,
}

impl PipelineStep for MarkerTrackingStep {
    fn process(&self, sheet: &mut SheetContext, _context: &PipelineContext) -> Result<(), SheetError> {
        let bitmap = sheet.marker_bitmap.as_ref().ok_or(SheetError::MissingStage {
            step: self.name(),
            requires: "marker bitmap",
        })?;
        let tracked = markers::track_markers(bitmap, &self.layout, &self.tracker)?;
        sheet.markers = Some(tracked);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Marker Tracking"
    }

    fn debug_image(&self, sheet: &SheetContext) -> Option<DynamicImage> {
        let markers = sheet.markers.as_ref()?;
        let canvas = preview::render_marker_preview(&sheet.original, markers);
        let canvas = match &sheet.answer_bitmap {
            Some(bitmap) => preview::render_fill_overlay(canvas, bitmap),
            None => canvas,
        };
        Some(DynamicImage::ImageRgb8(canvas))
    }
}

/// Sample the bubble grid for the student number and answers
pub struct GridDecodeStep {
    pub layout: SheetLayout,
}

impl PipelineStep for GridDecodeStep {
    fn process(&self, sheet: &mut SheetContext, _context: &PipelineContext) -> Result<(), SheetError> {
        let bitmap = sheet.answer_bitmap.as_ref().ok_or(SheetError::MissingStage {
            step: self.name(),
            requires: "answer bitmap",
        })?;
        let markers = sheet.markers.as_ref().ok_or(SheetError::MissingStage {
            step: self.name(),
            requires: "tracked markers",
        })?;

        sheet.decoded = Some(grid::decode_grid(bitmap, markers, &self.layout));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Grid Decode"
    }

    fn debug_image(&self, sheet: &SheetContext) -> Option<DynamicImage> {
        let decoded = sheet.decoded.as_ref()?;
        Some(DynamicImage::ImageRgb8(preview::render_answer_preview(
            &sheet.original,
            decoded,
        )))
    }
}

/// Compare decoded answers against the shared key
pub struct ScoreStep {
    pub key: Arc<AnswerKey>,
}

impl PipelineStep for ScoreStep {
    fn process(&self, sheet: &mut SheetContext, _context: &PipelineContext) -> Result<(), SheetError> {
        let decoded = sheet.decoded.as_ref().ok_or(SheetError::MissingStage {
            step: self.name(),
            requires: "decoded grid",
        })?;
        sheet.score = Some(scoring::score(&decoded.answers, &self.key)?);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Score"
    }
}
