use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;

use crate::detection::preprocessing::Bitmap;
use crate::error::SheetError;
use crate::models::{DecodedSheet, Markers};

const POSITION_MARKER: Rgb<u8> = Rgb([255, 0, 0]);
const POSITION_MARKER_LINE: Rgb<u8> = Rgb([0, 0, 255]);
const ANSWER_MARKER: Rgb<u8> = Rgb([0, 255, 0]);

/// Original sheet with a dot on every marker centroid and a guide line from
/// each marker to the edge it was found on.
pub fn render_marker_preview(original: &DynamicImage, markers: &Markers) -> RgbImage {
    let mut canvas = original.to_rgb8();
    let (width, height) = canvas.dimensions();
    let dot = (width / 160).max(2) as i32;
    let line = (width / 500).max(1);

    for point in markers.horizontal.points() {
        let guide = Rect::at(point.x as i32 - line as i32 / 2, point.y as i32)
            .of_size(line, (height - point.y).max(1));
        draw_filled_rect_mut(&mut canvas, guide, POSITION_MARKER_LINE);
        draw_filled_circle_mut(&mut canvas, (point.x as i32, point.y as i32), dot, POSITION_MARKER);
    }
    for point in markers.vertical.points() {
        let guide = Rect::at(point.x as i32, point.y as i32 - line as i32 / 2)
            .of_size((width - point.x).max(1), line);
        draw_filled_rect_mut(&mut canvas, guide, POSITION_MARKER_LINE);
        draw_filled_circle_mut(&mut canvas, (point.x as i32, point.y as i32), dot, POSITION_MARKER);
    }

    canvas
}

/// Paint every foreground pixel of the bitmap green on top of `base`.
pub fn render_fill_overlay(mut base: RgbImage, bitmap: &Bitmap) -> RgbImage {
    for (x, y, pixel) in base.enumerate_pixels_mut() {
        if bitmap.is_filled(x, y) {
            *pixel = ANSWER_MARKER;
        }
    }
    base
}

/// Original sheet with a ring around every filled number and answer cell.
pub fn render_answer_preview(original: &DynamicImage, decoded: &DecodedSheet) -> RgbImage {
    let mut canvas = original.to_rgb8();
    let radius = (canvas.width() / 100).max(2) as i32;
    let border = (radius / 3).max(1);

    let cells = decoded
        .number_marks
        .iter()
        .map(|(point, _)| point)
        .chain(decoded.answer_marks.iter().map(|(point, _)| point));
    for point in cells {
        let center = (point.x as i32, point.y as i32);
        for r in radius - border + 1..=radius {
            draw_hollow_circle_mut(&mut canvas, center, r, POSITION_MARKER);
        }
    }

    canvas
}

/// `{number}_{score}_{original}`, the name an annotated sheet is saved under.
pub fn preview_file_name(number: &str, score: u32, original: &str) -> String {
    format!("{}_{}_{}", number, score, original)
}

pub fn write_preview(path: &Path, image: &RgbImage) -> Result<(), SheetError> {
    image.save(path).map_err(|e| SheetError::Preview {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_name_keeps_short_numbers() {
        assert_eq!(preview_file_name("123", 87, "scan01.jpg"), "123_87_scan01.jpg");
        assert_eq!(preview_file_name("", 0, "blank.png"), "_0_blank.png");
    }
}
