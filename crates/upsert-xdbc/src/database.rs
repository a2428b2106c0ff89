//! ADBC Database
//!
//! A database holds the configuration shared by every connection opened on
//! it. The upsert opens one connection per overwrite.

use adbc_core::{
    Database as _,
    driver_manager::ManagedDatabase as ManagedAdbcDatabase,
    error::Result,
    options::{OptionConnection, OptionValue},
};

use crate::{Backend, Connection, connection::AdbcConnection};

mod builder;
pub use builder::*;
pub(crate) use builder::redact_uri;

/// XDBC Database.
///
/// dyn-compatible trait covering the connection factory of adbc_core::Database.
/// Database options are fixed when the database is built.
pub trait Database: Send + Sync {
    fn backend(&self) -> Backend;

    fn new_connection_with_opts(
        &mut self,
        opts: Vec<(OptionConnection, OptionValue)>,
    ) -> Result<Box<dyn Connection>>;
}

/// ADBC Database.
pub(crate) struct AdbcDatabase {
    backend: Backend,
    managed_database: ManagedAdbcDatabase,
}

impl AdbcDatabase {
    pub fn new(backend: Backend, managed_database: ManagedAdbcDatabase) -> Self {
        Self {
            backend,
            managed_database,
        }
    }
}

impl Database for AdbcDatabase {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn new_connection_with_opts(
        &mut self,
        conn_opts: Vec<(OptionConnection, OptionValue)>,
    ) -> Result<Box<dyn Connection>> {
        let _span = tracy_client::span!("open connection");
        let conn = if conn_opts.is_empty() {
            self.managed_database.new_connection()
        } else {
            self.managed_database.new_connection_with_opts(conn_opts)
        }?;
        tracing::debug!(backend = %self.backend, "opened destination connection");
        Ok(Box::new(AdbcConnection(self.backend, conn)))
    }
}
