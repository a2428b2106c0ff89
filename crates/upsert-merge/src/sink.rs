//! Destinations a reconciled dataset can be written to.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchIterator};
use datafusion::datasource::MemTable;
use datafusion::prelude::{DataFrame, SessionContext};
use parking_lot::RwLock;
use upsert_error::{ErrorCode, UpsertError, UpsertResult, err};
use upsert_xdbc::{Destination, driver, ingest};

/// A table whose contents can be replaced wholesale.
///
/// `overwrite` blocks; callers in async code run it on a blocking thread.
pub trait TableSink: Send + Sync {
    /// Name of the table, for logs and summaries.
    fn table(&self) -> String;

    /// Replaces the table's contents with `batches`.
    ///
    /// Returns the number of rows written if the destination reports it.
    fn overwrite(&self, schema: SchemaRef, batches: Vec<RecordBatch>) -> UpsertResult<Option<i64>>;
}

/// Writes to a database table through an ADBC driver.
#[derive(Debug, Clone)]
pub struct XdbcSink {
    destination: Destination,
}

impl XdbcSink {
    pub fn new(destination: Destination) -> Self {
        Self { destination }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }
}

impl TableSink for XdbcSink {
    fn table(&self) -> String {
        self.destination.table.clone()
    }

    fn overwrite(&self, schema: SchemaRef, batches: Vec<RecordBatch>) -> UpsertResult<Option<i64>> {
        let table = &self.destination.table;
        let backend = self.destination.backend().map_err(|e| {
            Box::new(UpsertError::from(e).with_context("Unsupported destination"))
        })?;
        let mut driver = driver::Builder::new(backend).try_load().map_err(|e| {
            Box::new(
                UpsertError::from(e)
                    .with_context(format!("Failed to load the {backend} driver")),
            )
        })?;
        let reader = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
        ingest::overwrite_table(&mut driver, &self.destination, Box::new(reader)).map_err(|e| {
            Box::new(UpsertError::from(e).with_context(format!("Failed to overwrite {table}")))
        })
    }
}

/// An in-process table, used for dry runs and tests.
///
/// Clones share the same contents.
#[derive(Clone, Debug)]
pub struct MemorySink {
    table: String,
    contents: Arc<RwLock<Option<(SchemaRef, Vec<RecordBatch>)>>>,
}

impl MemorySink {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            contents: Arc::new(RwLock::new(None)),
        }
    }

    /// The last written schema and batches, if anything was written.
    pub fn contents(&self) -> Option<(SchemaRef, Vec<RecordBatch>)> {
        self.contents.read().clone()
    }

    /// The table's contents as a DataFrame in `ctx`.
    pub fn read(&self, ctx: &SessionContext) -> UpsertResult<DataFrame> {
        let Some((schema, batches)) = self.contents() else {
            return err!(
                ErrorCode::InvalidArgument,
                "Table {} has not been written yet",
                self.table
            );
        };
        let table = MemTable::try_new(schema, vec![batches])?;
        Ok(ctx.read_table(Arc::new(table))?)
    }
}

impl TableSink for MemorySink {
    fn table(&self) -> String {
        self.table.clone()
    }

    fn overwrite(&self, schema: SchemaRef, batches: Vec<RecordBatch>) -> UpsertResult<Option<i64>> {
        let rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>();
        *self.contents.write() = Some((schema, batches));
        Ok(Some(rows as i64))
    }
}
