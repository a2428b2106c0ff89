//! Bulk overwrite of a destination table.

use adbc_core::{error::Result, options::IngestMode};
use arrow_array::RecordBatchReader;

use crate::{Destination, Driver, connection, str_from_sqlstate};

/// Replaces the contents of the destination table with `reader`.
///
/// Opens a database, a connection and a statement on `driver`, then binds the
/// stream under ingest mode `replace`. The table is created when missing.
/// Returns the number of rows written when the driver reports it.
///
/// One attempt is made. A failure after the driver dropped the old table
/// leaves the destination in whatever state the driver left it.
pub fn overwrite_table(
    driver: &mut Box<dyn Driver>,
    destination: &Destination,
    reader: Box<dyn RecordBatchReader + Send>,
) -> Result<Option<i64>> {
    let _span = tracy_client::span!("overwrite_table");
    let table = destination.table_ref()?;
    let mut database = destination.database_builder()?.build(driver)?;
    let mut conn = connection::Builder::default().build(&mut database)?;
    let mut stmt = conn.new_statement()?;
    stmt.set_ingest_target(table.db_schema.as_deref(), &table.name, IngestMode::Replace)?;
    stmt.bind_stream(reader)?;
    tracing::debug!(%table, backend = %database.backend(), "ingesting into destination table");
    stmt.execute_update().inspect_err(|e| {
        tracing::debug!(
            %table,
            sqlstate = %str_from_sqlstate(&e.sqlstate),
            "destination rejected the write"
        );
    })
}
