use crate::answer_key::AnswerKey;
use crate::error::SheetError;
use crate::models::AnswerMatrix;

/// Count the key rows whose decoded row matches exactly, stray marks included.
///
/// Rows beyond the key's length are ignored; fewer decoded rows than key rows
/// means decoding went wrong upstream and is reported instead of truncated.
pub fn score(answers: &AnswerMatrix, key: &AnswerKey) -> Result<u32, SheetError> {
    if answers.len() < key.len() {
        return Err(SheetError::RowCountMismatch {
            expected: key.len(),
            actual: answers.len(),
        });
    }

    let correct = key
        .rows()
        .iter()
        .zip(answers)
        .filter(|(expected, decoded)| expected == decoded)
        .count();

    Ok(correct as u32)
}
