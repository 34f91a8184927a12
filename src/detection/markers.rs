use tracing::debug;

use crate::config::{SheetLayout, TrackerConfig};
use crate::detection::contours::locate_blobs;
use crate::detection::preprocessing::Bitmap;
use crate::error::SheetError;
use crate::models::{Axis, BoundingBox, MarkerSequence, Markers};

/// Find both calibration sequences of a sheet.
pub fn track_markers(
    bitmap: &Bitmap,
    layout: &SheetLayout,
    tracker: &TrackerConfig,
) -> Result<Markers, SheetError> {
    let horizontal = track_axis(bitmap, Axis::Horizontal, layout.horizontal_markers, tracker)?;
    let vertical = track_axis(bitmap, Axis::Vertical, layout.vertical_markers, tracker)?;
    Ok(Markers {
        horizontal,
        vertical,
    })
}

/// The `index`-th strip for an axis, counted from the edge inward.
///
/// Horizontal strips span the full width and step up from the bottom edge;
/// vertical strips span the full height and step left from the right edge.
pub fn edge_strip(bitmap: &Bitmap, axis: Axis, index: u32, thickness: u32) -> Option<BoundingBox> {
    let extent = match axis {
        Axis::Horizontal => bitmap.height(),
        Axis::Vertical => bitmap.width(),
    };
    let inset = thickness.checked_mul(index + 1)?;
    let start = extent.checked_sub(inset)?;

    let strip = match axis {
        Axis::Horizontal => BoundingBox::new(0, start, bitmap.width(), thickness),
        Axis::Vertical => BoundingBox::new(start, 0, thickness, bitmap.height()),
    };
    Some(strip)
}

/// Scan strips inward from the edge until one holds exactly `expected` blobs.
///
/// The first matching strip wins. When the scan range is exhausted the error
/// carries the count closest to `expected` that any strip produced.
pub fn track_axis(
    bitmap: &Bitmap,
    axis: Axis,
    expected: usize,
    tracker: &TrackerConfig,
) -> Result<MarkerSequence, SheetError> {
    let extent = match axis {
        Axis::Horizontal => bitmap.height(),
        Axis::Vertical => bitmap.width(),
    };
    let strips = tracker.strip_count(extent);
    let mut best: Option<usize> = None;

    for index in 0..strips {
        let Some(strip) = edge_strip(bitmap, axis, index, tracker.strip_step) else {
            break;
        };
        let points = locate_blobs(bitmap, &strip);
        debug!(
            "{} strip {}: at ({}, {}) {}x{} has {} blobs",
            axis,
            index,
            strip.x,
            strip.y,
            strip.width,
            strip.height,
            points.len()
        );

        if points.len() == expected {
            return MarkerSequence::new(axis, points, expected);
        }

        let closer = best.is_none_or(|b| points.len().abs_diff(expected) < b.abs_diff(expected));
        if closer {
            best = Some(points.len());
        }
    }

    Err(SheetError::MarkerCount {
        axis,
        expected,
        observed: best.unwrap_or(0),
    })
}
