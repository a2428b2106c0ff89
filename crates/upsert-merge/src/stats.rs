use std::fmt;

use arrow::array::{Array, AsArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use upsert_error::{ErrorCode, UpsertResult, err};

/// Classification of a reconciled row.
///
/// Keys found only in Current are dropped and never carry an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    /// Key present only in New.
    Inserted,
    /// Key present in both, at least one compared column differs.
    Updated,
    /// Key present in both, all compared columns equal.
    Unchanged,
}

/// Row counts per bucket of a reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Keys present only in Current, omitted from the result.
    pub dropped: usize,
}

impl ReconcileStats {
    /// Number of reconciled rows.
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }

    pub fn record(&mut self, action: Action, rows: usize) {
        match action {
            Action::Inserted => self.inserted += rows,
            Action::Updated => self.updated += rows,
            Action::Unchanged => self.unchanged += rows,
        }
    }

    /// Tallies the action labels of `column` in `batch`.
    pub(crate) fn record_batch(&mut self, batch: &RecordBatch, column: usize) -> UpsertResult<()> {
        let array = batch.column(column);
        let labels: Vec<Option<&str>> = match array.data_type() {
            DataType::Utf8 => array.as_string::<i32>().iter().collect(),
            DataType::LargeUtf8 => array.as_string::<i64>().iter().collect(),
            DataType::Utf8View => array.as_string_view().iter().collect(),
            other => return err!(ErrorCode::Unexpected, "Action column has type {other}"),
        };
        for label in labels {
            let Some(action) = label.and_then(|l| l.parse::<Action>().ok()) else {
                return err!(ErrorCode::Unexpected, "Invalid action label {label:?}");
            };
            self.record(action, 1);
        }
        Ok(())
    }
}

impl fmt::Display for ReconcileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} unchanged, {} dropped",
            self.inserted, self.updated, self.unchanged, self.dropped
        )
    }
}

/// Outcome of [crate::Upserter::reconcile_and_persist].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    /// Destination table as named by the sink.
    pub table: String,
    #[serde(flatten)]
    pub stats: ReconcileStats,
    /// Rows the destination reports as written, when it reports them.
    pub rows_written: Option<i64>,
}
