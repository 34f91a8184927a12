use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::detection::preprocessing::{self, Bitmap};
use crate::error::SheetError;
use crate::models::{DecodedSheet, Markers, SheetResult};

/// Everything one sheet accumulates on its way through the pipeline.
///
/// Each step fills in the next field; later steps read what earlier ones
/// left behind. The context owns all of it, so sheets share nothing.
#[derive(Clone)]
pub struct SheetContext {
    /// Identifier reported in results, usually the file name
    pub source: String,

    /// The raster as loaded, kept for previews
    pub original: Arc<DynamicImage>,

    pub gray: GrayImage,

    /// Thresholded for marker tracking
    pub marker_bitmap: Option<Bitmap>,

    /// Thresholded for bubble sampling
    pub answer_bitmap: Option<Bitmap>,

    pub markers: Option<Markers>,
    pub decoded: Option<DecodedSheet>,
    pub score: Option<u32>,
}

impl SheetContext {
    pub fn new(source: impl Into<String>, image: DynamicImage) -> Self {
        let gray = preprocessing::to_grayscale(&image);
        Self {
            source: source.into(),
            original: Arc::new(image),
            gray,
            marker_bitmap: None,
            answer_bitmap: None,
            markers: None,
            decoded: None,
            score: None,
        }
    }

    /// Load and decode an image file. Unreadable files are an invalid raster.
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        let image = image::ImageReader::open(path)
            .map_err(|e| SheetError::InvalidRaster(format!("{}: {}", path.display(), e)))?
            .with_guessed_format()
            .map_err(|e| SheetError::InvalidRaster(format!("{}: {}", path.display(), e)))?
            .decode()
            .map_err(|e| SheetError::InvalidRaster(format!("{}: {}", path.display(), e)))?;

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(source, image))
    }

    /// Freeze a fully processed sheet into its result.
    pub fn into_result(self) -> Result<SheetResult, SheetError> {
        let decoded = self.decoded.ok_or(SheetError::MissingStage {
            step: "result",
            requires: "decoded grid",
        })?;
        let score = self.score.ok_or(SheetError::MissingStage {
            step: "result",
            requires: "score",
        })?;

        Ok(SheetResult {
            source: self.source,
            number: decoded.number,
            answers: decoded.answers,
            score,
        })
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// One stage of sheet decoding.
pub trait PipelineStep: Send + Sync {
    /// Advance the sheet by one stage
    fn process(&self, sheet: &mut SheetContext, context: &PipelineContext) -> Result<(), SheetError>;

    /// Human-readable name for this step (used in logs and debug folders)
    fn name(&self) -> &'static str;

    /// Intermediate artifact worth looking at after this step ran
    fn debug_image(&self, _sheet: &SheetContext) -> Option<DynamicImage> {
        None
    }
}

/// Composable pipeline builder
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });

        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step on the sheet
    pub fn run(&self, sheet: SheetContext) -> Result<SheetContext, SheetError> {
        self.run_partial(sheet, self.steps.len())
    }

    /// Run only the first `num_steps` steps, leaving later fields unset
    pub fn run_partial(&self, mut sheet: SheetContext, num_steps: usize) -> Result<SheetContext, SheetError> {
        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!("{}: running step {} ({})", sheet.source, step_idx + 1, step.name());
            step.process(&mut sheet, &self.context)?;
            self.save_debug_output(&sheet, step_idx, step.as_ref());
        }
        Ok(sheet)
    }

    /// Debug images are best effort; a failed write never fails the sheet.
    fn save_debug_output(&self, sheet: &SheetContext, step_idx: usize, step: &dyn PipelineStep) {
        let Some(debug_config) = &self.context.debug else {
            return;
        };
        let Some(image) = step.debug_image(sheet) else {
            return;
        };

        let stem = Path::new(&sheet.source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| sheet.source.clone());
        let sheet_dir = debug_config.output_dir.join(stem);
        let filename = format!(
            "{:02}_{}.png",
            step_idx + 1,
            step.name().to_lowercase().replace(' ', "_")
        );
        let output_path = sheet_dir.join(&filename);

        let saved = std::fs::create_dir_all(&sheet_dir)
            .map_err(|e| e.to_string())
            .and_then(|_| image.save(&output_path).map_err(|e| e.to_string()));
        match saved {
            Ok(()) => debug!("Debug: saved {}", output_path.display()),
            Err(e) => tracing::warn!("Failed to save debug image {}: {}", output_path.display(), e),
        }
    }
}
