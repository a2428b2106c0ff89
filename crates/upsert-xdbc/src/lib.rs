//! Arrow Database Connectivity for overwriting destination tables.
//!
//! Drivers are loaded dynamically ([`driver::Builder`]), configured through
//! [`database::Builder`] and [`connection::Builder`], and used through the
//! dyn-compatible [`Driver`], [`Database`], [`Connection`] and [`Statement`]
//! traits. [`Destination`] describes a target table JDBC-style.

use std::ffi::c_char;

pub mod driver;
pub use driver::Backend;
pub use driver::Driver;

pub mod database;
pub use database::Database;

pub mod connection;
pub use connection::Connection;

pub mod statement;
pub use statement::Statement;

pub mod destination;
pub use destination::{Destination, TableRef};

pub mod ingest;
pub mod jdbc;

pub(crate) mod builder;

// Constants for different backends
pub mod snowflake;

/// Interpret the SQLSTATE [1] 5-char ASCII string as a Rust string.
///
/// Non-ASCII bytes yield an empty string.
///
/// [1] https://en.wikipedia.org/wiki/SQLSTATE
pub fn str_from_sqlstate(sqlstate: &[c_char; 5]) -> String {
    let bytes = sqlstate.map(|c| c as u8);
    match std::str::from_utf8(&bytes) {
        Ok(s) if s.is_ascii() => s.trim_end_matches('\0').to_string(),
        _ => String::new(),
    }
}
