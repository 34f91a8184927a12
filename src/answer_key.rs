use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::config::SheetLayout;
use crate::error::AnswerKeyError;
use crate::models::AnswerRow;

/// Correct option pattern for every question, validated against the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    rows: Vec<AnswerRow>,
}

impl AnswerKey {
    /// Build a key from rows already in memory, applying the same shape checks as parsing.
    pub fn new(rows: Vec<AnswerRow>, layout: &SheetLayout) -> Result<Self, AnswerKeyError> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != layout.options_per_question {
                return Err(AnswerKeyError::ColumnCount {
                    row: index + 1,
                    expected: layout.options_per_question,
                    found: row.len(),
                });
            }
        }
        if rows.len() != layout.questions {
            return Err(AnswerKeyError::RowCount {
                expected: layout.questions,
                found: rows.len(),
            });
        }
        Ok(Self { rows })
    }

    pub fn from_path(path: &Path, layout: &SheetLayout) -> Result<Self, AnswerKeyError> {
        let file = File::open(path)?;
        Self::parse(file, layout)
    }

    /// Parse CSV: one ignored header record, then one record per question
    /// whose first field is an ignored label and whose remaining fields mark
    /// correct options with `x`.
    pub fn parse<R: Read>(reader: R, layout: &SheetLayout) -> Result<Self, AnswerKeyError> {
        let mut records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();

        for record in records.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let row: AnswerRow = record.iter().skip(1).map(is_marked).collect();
            if row.len() != layout.options_per_question {
                return Err(AnswerKeyError::ColumnCount {
                    row: rows.len() + 1,
                    expected: layout.options_per_question,
                    found: row.len(),
                });
            }
            rows.push(row);
        }

        Self::new(rows, layout)
    }

    pub fn rows(&self) -> &[AnswerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn is_marked(field: &str) -> bool {
    field == "x"
}
