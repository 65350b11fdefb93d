//! Batched MySQL upserts.
//!
//! Turns a uniform collection of records into the smallest sequence of
//! `INSERT ... ON DUPLICATE KEY UPDATE` statements that stays under the
//! per-statement placeholder ceiling, stamping the acting user onto the
//! reserved audit columns of every row.

mod planner;
mod query_builder;

pub use planner::{plan_batches, BatchPlan, PlanError};
pub use query_builder::{
    build_column_lists, build_upsert_statement, format_table_name, quote_identifier, Statement,
};

use mysql_async::Value;
use tracing::{debug, error};

use crate::audit;
use crate::database::batch_upsert::UpsertRecord;
use crate::database::mysql::client::{MysqlError, UpsertExecutor};

/// Maximum number of positional parameters one statement may bind - MySQL's
/// binary protocol carries the count as a u16.
pub const MAX_PLACEHOLDERS_PER_STATEMENT: usize = 65_535;

/// Running success/failure totals for one bulk upsert call.
///
/// Batches commit independently: on a mid-sequence failure `upsert_count`
/// keeps the rows of every batch committed before it, the failing batch's
/// rows land in `upsert_fail_count` in full, and later batches are never
/// attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkUpsertStats {
    pub upsert_count: usize,
    pub upsert_fail_count: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum BatchUpsertError {
    #[error("the first record for `{table}` yields no selectable columns")]
    NoSelectableColumns { table: &'static str },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(
        "record {record_index} does not match the column shape derived from the first record"
    )]
    RecordShapeMismatch { record_index: usize },

    #[error(
        "batch {batch_index} failed after {committed} committed rows: {source}",
        committed = stats.upsert_count
    )]
    BatchFailed {
        batch_index: usize,
        stats: BulkUpsertStats,
        #[source]
        source: MysqlError,
    },
}

/// Terminal state of the batch loop. Holding the first failure as a value
/// makes "no further batches attempted" structural rather than a side effect
/// of control flow.
enum BatchRun {
    Completed,
    Failed { batch_index: usize, error: MysqlError },
}

/// Upserts `records` in placeholder-bounded batches.
///
/// Returns `Ok(None)` for empty input without touching the database. On a
/// batch failure the error carries the stats accumulated up to that point;
/// earlier batches keep their effect.
pub async fn batch_upsert<T, E>(
    database: &E,
    records: &[T],
    ignore_errors: bool,
) -> Result<Option<BulkUpsertStats>, BatchUpsertError>
where
    T: UpsertRecord,
    E: UpsertExecutor + ?Sized,
{
    batch_upsert_with_ceiling(database, records, ignore_errors, MAX_PLACEHOLDERS_PER_STATEMENT)
        .await
}

async fn batch_upsert_with_ceiling<T, E>(
    database: &E,
    records: &[T],
    ignore_errors: bool,
    max_placeholders: usize,
) -> Result<Option<BulkUpsertStats>, BatchUpsertError>
where
    T: UpsertRecord,
    E: UpsertExecutor + ?Sized,
{
    // If there is no data, nothing to do.
    if records.is_empty() {
        return Ok(None);
    }

    // The first record fixes the column shape for the whole call.
    let main_fields = records[0].describe_fields();
    let (columns, update_columns) = build_column_lists(&main_fields);
    if columns.is_empty() {
        return Err(BatchUpsertError::NoSelectableColumns { table: T::TABLE_NAME });
    }

    let expected_names: Vec<&'static str> =
        main_fields.iter().filter(|field| field.is_selected()).map(|field| field.name).collect();

    // Best-effort: with no acting user in scope, record-held values stand.
    let acting_user = audit::current_user();

    let rows = materialize_rows(records, &expected_names, acting_user.as_deref())?;

    let plan = plan_batches(records.len(), columns.len(), max_placeholders)?;
    let formatted_table_name = format_table_name(T::TABLE_NAME);

    let mut stats = BulkUpsertStats::default();
    let run = execute_batches(
        database,
        &formatted_table_name,
        &columns,
        &update_columns,
        &rows,
        &plan,
        ignore_errors,
        &mut stats,
    )
    .await;

    match run {
        BatchRun::Completed => Ok(Some(stats)),
        BatchRun::Failed { batch_index, error } => {
            Err(BatchUpsertError::BatchFailed { batch_index, stats, source: error })
        }
    }
}

/// Describes and resolves every record up front, validating each row's
/// selected columns against the call-wide shape before anything executes.
/// Divergence here would otherwise corrupt positional parameters silently.
fn materialize_rows<T: UpsertRecord>(
    records: &[T],
    expected_names: &[&'static str],
    acting_user: Option<&str>,
) -> Result<Vec<Vec<Value>>, BatchUpsertError> {
    let mut rows = Vec::with_capacity(records.len());

    for (record_index, record) in records.iter().enumerate() {
        let fields = record.describe_fields();
        let selected: Vec<_> = fields.iter().filter(|field| field.is_selected()).collect();

        let aligned = selected.len() == expected_names.len() &&
            selected.iter().zip(expected_names).all(|(field, name)| field.name == *name);
        if !aligned {
            return Err(BatchUpsertError::RecordShapeMismatch { record_index });
        }

        rows.push(
            selected.iter().map(|field| audit::resolve_value(field, acting_user)).collect(),
        );
    }

    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
async fn execute_batches<E>(
    database: &E,
    formatted_table_name: &str,
    columns: &[String],
    update_columns: &[String],
    rows: &[Vec<Value>],
    plan: &BatchPlan,
    ignore_errors: bool,
    stats: &mut BulkUpsertStats,
) -> BatchRun
where
    E: UpsertExecutor + ?Sized,
{
    for (batch_index, range) in plan.ranges().enumerate() {
        let batch_rows = &rows[range];
        let statement = build_upsert_statement(
            formatted_table_name,
            columns,
            update_columns,
            batch_rows,
            ignore_errors,
        );

        debug!("Batch upsert statement: {}", statement.sql);

        match database.execute(&statement.sql, statement.params).await {
            Ok(_) => stats.upsert_count += batch_rows.len(),
            Err(e) => {
                stats.upsert_fail_count += batch_rows.len();
                error!(
                    "{} - batch {} of {} failed: {}",
                    formatted_table_name,
                    batch_index + 1,
                    plan.batch_count(),
                    e
                );
                return BatchRun::Failed { batch_index, error: e };
            }
        }
    }

    BatchRun::Completed
}
