use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GrayImage, Luma};
use marksheet::config::SheetLayout;
use marksheet::{AnswerKey, AnswerMatrix, SheetContext};

/// Geometry of the synthetic sheet: markers every `PITCH` pixels, starting
/// at `ORIGIN`, drawn as `INK` squares of side `2 * HALF + 1`.
pub const PITCH: u32 = 12;
pub const ORIGIN: u32 = 10;
pub const HALF: u32 = 2;
pub const SHEET_WIDTH: u32 = 600;
pub const SHEET_HEIGHT: u32 = 340;
/// Row of the bottom (horizontal) markers
pub const BOTTOM_MARKER_Y: u32 = 330;
/// Column of the right (vertical) markers
pub const RIGHT_MARKER_X: u32 = 590;

const PAPER: u8 = 255;
const INK: u8 = 0;

pub fn column_x(index: u32) -> u32 {
    ORIGIN + PITCH * index
}

pub fn row_y(index: u32) -> u32 {
    ORIGIN + PITCH * index
}

fn stamp(img: &mut GrayImage, cx: u32, cy: u32) {
    for y in cy - HALF..=cy + HALF {
        for x in cx - HALF..=cx + HALF {
            img.put_pixel(x, y, Luma([INK]));
        }
    }
}

/// Printed content of a synthetic sheet.
#[derive(Debug, Clone)]
pub struct SheetSpec {
    /// One entry per number column; `None` leaves the column blank
    pub number: Vec<Option<u8>>,
    /// 100 rows of 10 options, block-major
    pub answers: AnswerMatrix,
    /// Bottom marker indices to leave out, to simulate a damaged sheet
    pub missing_bottom_markers: Vec<u32>,
}

impl SheetSpec {
    pub fn new(number: &str, answers: AnswerMatrix) -> Self {
        let number = number
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect();
        Self {
            number,
            answers,
            missing_bottom_markers: Vec::new(),
        }
    }
}

/// Draw a sheet with the default 47 + 25 marker layout.
pub fn render_sheet(spec: &SheetSpec) -> GrayImage {
    let layout = SheetLayout::default();
    let mut img = GrayImage::from_pixel(SHEET_WIDTH, SHEET_HEIGHT, Luma([PAPER]));

    for i in 0..layout.horizontal_markers as u32 {
        if !spec.missing_bottom_markers.contains(&i) {
            stamp(&mut img, column_x(i), BOTTOM_MARKER_Y);
        }
    }
    for j in 0..layout.vertical_markers as u32 {
        stamp(&mut img, RIGHT_MARKER_X, row_y(j));
    }

    for (column, digit) in spec.number.iter().enumerate() {
        if let Some(digit) = digit {
            stamp(&mut img, column_x(column as u32), row_y(*digit as u32));
        }
    }

    let rows_per_block = layout.vertical_markers;
    for (index, row) in spec.answers.iter().enumerate() {
        let block = (index / rows_per_block) as u32;
        let y = row_y((index % rows_per_block) as u32);
        for (option, filled) in row.iter().enumerate() {
            if *filled {
                let column = layout.number_columns as u32 + block * 10 + option as u32;
                stamp(&mut img, column_x(column), y);
            }
        }
    }

    img
}

pub fn sheet_context(name: &str, spec: &SheetSpec) -> SheetContext {
    SheetContext::new(name, DynamicImage::ImageLuma8(render_sheet(spec)))
}

/// Deterministic single-mark answers: question `q` marks option `q % 10`.
pub fn single_mark_answers() -> AnswerMatrix {
    (0..100)
        .map(|q| (0..10).map(|option| option == q % 10).collect())
        .collect()
}

/// Same as [`single_mark_answers`] with the first `wrong` questions shifted by one option.
pub fn answers_with_mistakes(wrong: usize) -> AnswerMatrix {
    let mut answers = single_mark_answers();
    for row in answers.iter_mut().take(wrong) {
        row.rotate_right(1);
    }
    answers
}

pub fn row(bits: [u8; 10]) -> Vec<bool> {
    bits.iter().map(|&b| b == 1).collect()
}

/// Answer key CSV text for `rows`, with a header and `x` marks.
pub fn key_csv(rows: &[Vec<bool>]) -> String {
    let mut text = String::from("question,1,2,3,4,5,6,7,8,9,10\n");
    for (index, row) in rows.iter().enumerate() {
        let fields: Vec<&str> = row.iter().map(|&m| if m { "x" } else { "" }).collect();
        text.push_str(&format!("{},{}\n", index + 1, fields.join(",")));
    }
    text
}

pub fn standard_key() -> Arc<AnswerKey> {
    Arc::new(
        AnswerKey::new(single_mark_answers(), &SheetLayout::default())
            .expect("standard key is well formed"),
    )
}

pub fn write_answer_key(dir: &Path, rows: &[Vec<bool>]) -> PathBuf {
    let path = dir.join("answer.csv");
    std::fs::write(&path, key_csv(rows)).expect("Failed to write answer key");
    path
}

pub fn save_sheet(dir: &Path, name: &str, spec: &SheetSpec) -> PathBuf {
    let path = dir.join(name);
    render_sheet(spec)
        .save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save synthetic sheet");
    path
}
