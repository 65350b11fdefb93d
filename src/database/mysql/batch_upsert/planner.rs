//! Splits a bulk upsert into statement-sized batches.
//!
//! MySQL caps the number of positional parameters a single prepared statement
//! may carry, so the rows that fit in one statement depend on how many columns
//! each row binds.

use std::ops::Range;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("cannot batch rows with zero selectable columns")]
    NoColumns,

    #[error(
        "a single row binds {column_count} placeholders which exceeds the \
         per-statement ceiling of {max_placeholders}"
    )]
    RowWiderThanStatement { column_count: usize, max_placeholders: usize },
}

/// An ordered set of `[start, end)` row ranges covering the input exactly
/// once, each small enough to fit one statement.
#[derive(Debug, PartialEq, Eq)]
pub struct BatchPlan {
    batch_size: usize,
    total_rows: usize,
}

impl BatchPlan {
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batch_count(&self) -> usize {
        self.total_rows.div_ceil(self.batch_size)
    }

    /// Ranges in input order; the final range is clipped to the row count.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.batch_count()).map(move |index| {
            let start = index * self.batch_size;
            start..(start + self.batch_size).min(self.total_rows)
        })
    }
}

/// Computes how many rows fit in one statement under `max_placeholders` and
/// the resulting batch ranges. Zero rows plan to zero batches; zero columns
/// are a caller error caught before any division happens.
pub fn plan_batches(
    total_rows: usize,
    column_count: usize,
    max_placeholders: usize,
) -> Result<BatchPlan, PlanError> {
    if column_count == 0 {
        return Err(PlanError::NoColumns);
    }

    let batch_size = max_placeholders / column_count;
    if batch_size == 0 {
        return Err(PlanError::RowWiderThanStatement { column_count, max_placeholders });
    }

    Ok(BatchPlan { batch_size, total_rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_rows_under_placeholder_ceiling() {
        // 10000 placeholders / 7 columns = 1428 rows per statement.
        let plan = plan_batches(3000, 7, 10_000).unwrap();

        assert_eq!(plan.batch_size(), 1428);
        assert_eq!(plan.batch_count(), 3);
        assert_eq!(plan.ranges().collect::<Vec<_>>(), vec![0..1428, 1428..2856, 2856..3000]);
    }

    #[test]
    fn test_exact_multiple_has_no_short_final_batch() {
        let plan = plan_batches(20, 5, 50).unwrap();

        assert_eq!(plan.batch_size(), 10);
        assert_eq!(plan.ranges().collect::<Vec<_>>(), vec![0..10, 10..20]);
    }

    #[test]
    fn test_zero_rows_plan_to_zero_batches() {
        let plan = plan_batches(0, 7, 10_000).unwrap();

        assert_eq!(plan.batch_count(), 0);
        assert_eq!(plan.ranges().count(), 0);
    }

    #[test]
    fn test_zero_columns_fail_fast() {
        assert_eq!(plan_batches(10, 0, 10_000), Err(PlanError::NoColumns));
    }

    #[test]
    fn test_row_wider_than_statement_fails() {
        assert_eq!(
            plan_batches(10, 200, 100),
            Err(PlanError::RowWiderThanStatement { column_count: 200, max_placeholders: 100 })
        );
    }
}
