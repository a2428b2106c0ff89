use std::sync::Arc;

use datafusion::prelude::DataFrame;
use upsert_error::UpsertResult;

use crate::options::UpsertOptions;
use crate::reconcile::{ReconciledBatches, Upserter};
use crate::sink::TableSink;
use crate::stats::UpsertSummary;

impl Upserter {
    /// Reconciles `current` with `new` and overwrites `sink` with the result.
    ///
    /// The sink write runs on a blocking thread and is attempted once. Errors
    /// from the sink are returned as they are; the destination may be left
    /// partially written.
    pub async fn reconcile_and_persist(
        &self,
        current: DataFrame,
        new: DataFrame,
        options: &UpsertOptions,
        sink: Arc<dyn TableSink>,
    ) -> UpsertResult<UpsertSummary> {
        let ReconciledBatches {
            schema,
            batches,
            stats,
        } = self.reconcile(current, new, options).await?.collect().await?;
        let table = sink.table();
        tracing::info!(
            table = %table,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            dropped = stats.dropped,
            "reconciled datasets"
        );

        let rows_written = tokio::task::spawn_blocking(move || {
            let _span = tracy_client::span!("overwrite destination");
            sink.overwrite(schema, batches)
        })
        .await??;
        if let Some(written) = rows_written {
            if written >= 0 && written as usize != stats.total() {
                tracing::debug!(
                    written,
                    expected = stats.total(),
                    "destination reported an unexpected row count"
                );
            }
        }

        tracing::info!("Data successfully updated and loaded to table: {table}");
        Ok(UpsertSummary {
            table,
            stats,
            rows_written,
        })
    }
}
