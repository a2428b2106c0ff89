//! Merge-and-overwrite upsert.
//!
//! [Upserter::reconcile] compares a Current and a New dataset by primary key
//! and classifies every key as inserted, updated or unchanged. Keys present
//! only in Current are dropped. [Upserter::reconcile_and_persist] then
//! replaces a destination table ([TableSink]) with the reconciled rows.

mod options;
mod persist;
mod reconcile;
mod schema;
mod sink;
mod stats;

pub use options::{CompareColumns, NullEquality, UpsertOptions};
pub use reconcile::{ACTION_COLUMN, Reconciled, ReconciledBatches, Upserter};
pub use sink::{MemorySink, TableSink, XdbcSink};
pub use stats::{Action, ReconcileStats, UpsertSummary};
