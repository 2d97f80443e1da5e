//! Data table row selection (`--table-rows 2-4` style ranges).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Table rows range validation failed.")]
pub struct TableRangeError;

/// Convert 1-based `start`/`end` row numbers into 0-based indexes.
///
/// Fails when either bound is not a number, is below 1, when `start > end`,
/// or when `end` exceeds `row_count`.
pub fn validate_table_rows_range(
    start: &str,
    end: &str,
    row_count: usize,
) -> Result<(usize, usize), TableRangeError> {
    let start_row: i64 = start.parse().map_err(|_| TableRangeError)?;
    let end_row: i64 = end.parse().map_err(|_| TableRangeError)?;
    if start_row < 1 || end_row < 1 || start_row > end_row || end_row as u64 > row_count as u64 {
        return Err(TableRangeError);
    }
    Ok(((start_row - 1) as usize, (end_row - 1) as usize))
}
