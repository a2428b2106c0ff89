//! ADBC Statement
//!
//!

use core::fmt;

use adbc_core::{
    Optionable, Statement as _,
    driver_manager::ManagedStatement as ManagedAdbcStatement,
    error::Result,
    options::{IngestMode, OptionStatement, OptionValue},
};
use arrow_array::RecordBatchReader;

use crate::Backend;

/// XDBC Statement.
///
/// dyn-compatible trait inspired by the adbc_core::{Statement, Optionable} traits.
pub trait Statement: Send {
    /// Bind a stream of Arrow data, consumed when the statement executes.
    fn bind_stream(&mut self, reader: Box<dyn RecordBatchReader + Send>) -> Result<()>;

    /// Execute a statement and get the results.
    ///
    /// This invalidates any prior result sets.
    fn execute<'a>(&'a mut self) -> Result<Box<dyn RecordBatchReader + Send + 'a>>;

    /// Execute a statement that doesn't have a result set and get the number
    /// of affected rows.
    ///
    /// Returns `None` when the driver does not report a row count.
    fn execute_update(&mut self) -> Result<Option<i64>>;

    /// Set the SQL query to execute.
    fn set_sql_query(&mut self, query: &str) -> Result<()>;

    fn set_option(&mut self, key: OptionStatement, value: OptionValue) -> Result<()>;

    /// Configure the statement for bulk ingestion into `table`.
    ///
    /// `db_schema` qualifies the table when set. Data still has to be bound
    /// before executing.
    fn set_ingest_target(
        &mut self,
        db_schema: Option<&str>,
        table: &str,
        mode: IngestMode,
    ) -> Result<()> {
        self.set_option(
            OptionStatement::TargetTable,
            OptionValue::String(table.to_string()),
        )?;
        if let Some(db_schema) = db_schema {
            self.set_option(
                OptionStatement::TargetDbSchema,
                OptionValue::String(db_schema.to_string()),
            )?;
        }
        self.set_option(OptionStatement::IngestMode, mode.into())
    }

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dyn Statement")
    }
}

impl fmt::Debug for dyn Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug_fmt(f)
    }
}

/// ADBC Statement.
pub(crate) struct AdbcStatement(pub(crate) Backend, pub(crate) ManagedAdbcStatement);

impl Statement for AdbcStatement {
    fn bind_stream(&mut self, reader: Box<dyn RecordBatchReader + Send>) -> Result<()> {
        self.1.bind_stream(reader)
    }

    fn execute<'a>(&'a mut self) -> Result<Box<dyn RecordBatchReader + Send + 'a>> {
        let reader = self.1.execute()?;
        Ok(Box::new(reader))
    }

    fn execute_update(&mut self) -> Result<Option<i64>> {
        self.1.execute_update()
    }

    fn set_sql_query(&mut self, query: &str) -> Result<()> {
        self.1.set_sql_query(query)
    }

    fn set_option(&mut self, key: OptionStatement, value: OptionValue) -> Result<()> {
        self.1.set_option(key, value)
    }

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdbcStatement({:?})", self.0)
    }
}
