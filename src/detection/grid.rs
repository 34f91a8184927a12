use crate::config::SheetLayout;
use crate::detection::preprocessing::Bitmap;
use crate::models::{AnswerMatrix, DecodedSheet, MarkerPoint, Markers};

/// Read the student number and every answer row off the marker grid.
///
/// A cell is the intersection of a horizontal marker's x with a vertical
/// marker's y. Multiple filled options in a row are all reported.
pub fn decode_grid(bitmap: &Bitmap, markers: &Markers, layout: &SheetLayout) -> DecodedSheet {
    let columns = markers.horizontal.points();
    let rows = markers.vertical.points();
    let split = layout.number_columns.min(columns.len());
    let (number_columns, answer_columns) = columns.split_at(split);
    let number_rows = &rows[..layout.number_rows.min(rows.len())];

    let (number, number_marks) = decode_number(bitmap, number_columns, number_rows);
    let (answers, answer_marks) =
        decode_answers(bitmap, answer_columns, rows, layout.options_per_question);

    DecodedSheet {
        number,
        answers,
        number_marks,
        answer_marks,
    }
}

/// One digit per column: the first filled row from the top. Columns with no
/// filled row contribute nothing, so the number can come out short.
pub fn decode_number(
    bitmap: &Bitmap,
    columns: &[MarkerPoint],
    rows: &[MarkerPoint],
) -> (String, Vec<(MarkerPoint, usize)>) {
    let mut number = String::new();
    let mut marks = Vec::new();

    for column in columns {
        let hit = rows
            .iter()
            .enumerate()
            .find(|(_, row)| bitmap.is_filled(column.x, row.y));

        if let Some((digit, row)) = hit {
            number.push_str(&digit.to_string());
            marks.push((MarkerPoint::new(column.x, row.y), digit));
        }
    }

    (number, marks)
}

/// Sample every (block, row) pair, rows within a block before the next block.
pub fn decode_answers(
    bitmap: &Bitmap,
    columns: &[MarkerPoint],
    rows: &[MarkerPoint],
    options: usize,
) -> (AnswerMatrix, Vec<(MarkerPoint, usize)>) {
    let mut answers = AnswerMatrix::new();
    let mut marks = Vec::new();
    if options == 0 {
        return (answers, marks);
    }

    for block in columns.chunks_exact(options) {
        for row in rows {
            let answer: Vec<bool> = block
                .iter()
                .enumerate()
                .map(|(option, column)| {
                    let filled = bitmap.is_filled(column.x, row.y);
                    if filled {
                        marks.push((MarkerPoint::new(column.x, row.y), option + 1));
                    }
                    filled
                })
                .collect();
            answers.push(answer);
        }
    }

    (answers, marks)
}
