use std::fmt;

use crate::error::SheetError;

/// Which edge of the sheet a marker sequence runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Bottom edge; markers ordered by x.
    Horizontal,
    /// Right edge; markers ordered by y.
    Vertical,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

/// Centroid of a calibration marker, in full-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerPoint {
    pub x: u32,
    pub y: u32,
}

impl MarkerPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// (primary, secondary) sort key for the given axis.
    fn sort_key(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::Horizontal => (self.x, self.y),
            Axis::Vertical => (self.y, self.x),
        }
    }
}

/// Axis-aligned rectangle in full-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Intersection with a `width` x `height` image, `None` if nothing is left.
    pub fn clip(&self, width: u32, height: u32) -> Option<BoundingBox> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let clipped = BoundingBox {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        };
        (clipped.width > 0 && clipped.height > 0).then_some(clipped)
    }
}

/// Connected foreground region with the first-order moments needed for its centroid.
#[derive(Debug, Clone)]
pub struct Blob {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
    pub sum_x: u64,
    pub sum_y: u64,
}

impl Blob {
    pub fn area(&self) -> u32 {
        self.pixel_count
    }

    /// Mean pixel position, truncated to integers. `None` for an empty region.
    pub fn centroid(&self) -> Option<MarkerPoint> {
        if self.pixel_count == 0 {
            return None;
        }
        let count = self.pixel_count as u64;
        Some(MarkerPoint::new(
            (self.sum_x / count) as u32,
            (self.sum_y / count) as u32,
        ))
    }
}

/// Markers along one edge, sorted along that edge's axis.
///
/// Position `i` maps to logical column/row `i` of the printed grid, so a
/// sequence can only be built through [`MarkerSequence::new`], which sorts it
/// and checks the count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSequence {
    axis: Axis,
    points: Vec<MarkerPoint>,
}

impl MarkerSequence {
    pub fn new(axis: Axis, mut points: Vec<MarkerPoint>, expected: usize) -> Result<Self, SheetError> {
        if points.len() != expected {
            return Err(SheetError::MarkerCount {
                axis,
                expected,
                observed: points.len(),
            });
        }
        points.sort_by_key(|p| p.sort_key(axis));
        Ok(Self { axis, points })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn points(&self) -> &[MarkerPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Both calibration sequences of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub horizontal: MarkerSequence,
    pub vertical: MarkerSequence,
}

/// Fill state of each option in one question row, option `k` at index `k - 1`.
pub type AnswerRow = Vec<bool>;

/// Question rows in block-major order: block 1 rows, then block 2 rows, ...
pub type AnswerMatrix = Vec<AnswerRow>;

/// Output of the grid decoder, plus the filled cells a preview renderer draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSheet {
    pub number: String,
    pub answers: AnswerMatrix,
    /// Filled student-number cells with the digit they encode.
    pub number_marks: Vec<(MarkerPoint, usize)>,
    /// Filled answer cells with their 1-based option number.
    pub answer_marks: Vec<(MarkerPoint, usize)>,
}

/// Final outcome of one successfully processed sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetResult {
    pub source: String,
    pub number: String,
    pub answers: AnswerMatrix,
    pub score: u32,
}

/// A sheet that dropped out of the batch, and why.
#[derive(Debug)]
pub struct SheetFailure {
    pub source: String,
    pub error: SheetError,
}

impl fmt::Display for SheetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.error.kind(), self.error)
    }
}
