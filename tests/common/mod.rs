#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from marksheet for tests
pub use marksheet::{
    AnswerKey, AnswerKeyError, AnswerMatrix, Axis, BatchReport, BatchRunner, CancelFlag,
    MarksheetConfig, Pipeline, SheetContext, SheetError, SheetResult,
};
