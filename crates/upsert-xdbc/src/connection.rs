//! ADBC Connection
//!
//!

use core::fmt;

use adbc_core::{
    Connection as _, driver_manager::ManagedConnection as ManagedAdbcConnection, error::Result,
};
use arrow_schema::Schema;

use crate::statement::AdbcStatement;
use crate::{Backend, Statement};

mod builder;
pub use builder::*;

/// XDBC Connection.
///
/// A single, logical connection to the destination. Statements are created
/// from it to run queries and bulk ingestion.
///
/// dyn-compatible trait inspired by the adbc_core::{Connection, Optionable} traits.
pub trait Connection: Send {
    /// Allocate and initialize a new statement.
    fn new_statement(&mut self) -> Result<Box<dyn Statement>>;

    /// Get the Arrow schema of a table.
    ///
    /// # Arguments
    ///
    /// - `catalog` - The catalog (or `None` if not applicable).
    /// - `db_schema` - The database schema (or `None` if not applicable).
    /// - `table_name` - The table name.
    fn get_table_schema(
        &self,
        catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: &str,
    ) -> Result<Schema>;

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dyn Connection")
    }
}

impl fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug_fmt(f)
    }
}

/// ADBC Connection.
pub(crate) struct AdbcConnection(pub(crate) Backend, pub(crate) ManagedAdbcConnection);

impl Connection for AdbcConnection {
    fn new_statement(&mut self) -> Result<Box<dyn Statement>> {
        let managed_adbc_stmt = self.1.new_statement()?;
        Ok(Box::new(AdbcStatement(self.0, managed_adbc_stmt)))
    }

    fn get_table_schema(
        &self,
        catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: &str,
    ) -> Result<Schema> {
        self.1.get_table_schema(catalog, db_schema, table_name)
    }

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdbcConnection({:?}, ManagedAdbcConnection)", self.0)
    }
}
