use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Every knob of the decoding pipeline and the batch runner.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarksheetConfig {
    pub thresholds: ThresholdConfig,
    pub tracker: TrackerConfig,
    pub layout: SheetLayout,
    pub batch: BatchConfig,
}

/// Binarization thresholds. The marker pass and the bubble pass are tuned separately.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub marker: u8,
    pub answer: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            marker: 240,
            answer: 240,
        }
    }
}

/// Inward strip search used to find the calibration markers.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Strip thickness in pixels, and the distance between consecutive strips.
    pub strip_step: u32,
    /// Fraction of the image height (or width) the search may move inward.
    pub scan_ratio: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            strip_step: 10,
            scan_ratio: 0.25,
        }
    }
}

impl TrackerConfig {
    /// Number of strips scanned along an edge of length `extent`.
    pub fn strip_count(&self, extent: u32) -> u32 {
        if self.strip_step == 0 {
            return 0;
        }
        let reach = (extent as f32 * self.scan_ratio.clamp(0.0, 1.0)) as u32;
        reach.min(extent) / self.strip_step
    }
}

/// Printed grid geometry.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub horizontal_markers: usize,
    pub vertical_markers: usize,
    pub number_columns: usize,
    pub number_rows: usize,
    pub options_per_question: usize,
    pub questions: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            horizontal_markers: 47,
            vertical_markers: 25,
            number_columns: 7,
            number_rows: 10,
            options_per_question: 10,
            questions: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Accepted file extensions, matched case-sensitively and without the dot.
    pub extensions: Vec<String>,
    /// Concurrent sheets. `None` uses the available parallelism.
    pub workers: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".into(), "png".into(), "gif".into()],
            workers: None,
        }
    }
}

impl BatchConfig {
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}

impl MarksheetConfig {
    /// Layers an optional TOML file and `MARKSHEET__*` environment variables over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

/// `MARKSHEET__BATCH__EXTENSIONS="jpg png"` sets a list; other keys are scalars.
fn environment() -> config::Environment {
    config::Environment::with_prefix("MARKSHEET")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(" ")
        .with_list_parse_key("batch.extensions")
}
