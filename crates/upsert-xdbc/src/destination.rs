//! The destination table of an overwrite.

use std::{collections::BTreeMap, fmt};

use adbc_core::error::{Error, Result, Status};
use serde::Deserialize;
use url::Url;

use crate::{Backend, database, database::redact_uri, jdbc};

const HIDDEN: &str = "*****";

/// Connection descriptor for the table an upsert overwrites.
///
/// Mirrors a JDBC write: a `jdbc:` URL, the target table and a property bag.
/// `user`, `password` and `driver` are recognised properties; everything else
/// is forwarded to the driver.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Destination {
    pub url: String,
    pub table: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// A possibly schema-qualified table name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRef {
    pub db_schema: Option<String>,
    pub name: String,
}

impl TableRef {
    /// Splits `schema.table` on the last dot. Quoted identifiers are not
    /// interpreted.
    pub fn parse(table: &str) -> Result<Self> {
        let table = table.trim();
        let (db_schema, name) = match table.rsplit_once('.') {
            Some((schema, name)) => (Some(schema.to_string()), name),
            None => (None, table),
        };
        if name.is_empty() || db_schema.as_deref() == Some("") {
            return Err(Error::with_message_and_status(
                format!("Invalid table name: '{table}'"),
                Status::InvalidArguments,
            ));
        }
        Ok(Self {
            db_schema,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.db_schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A printable form of a JDBC URL with its credentials masked.
///
/// Only `//`-style URLs carry credentials. The file forms used by SQLite and
/// DuckDB are printed as they are.
fn redact_url(url: &str) -> String {
    let rest = url.strip_prefix("jdbc:").unwrap_or(url);
    if !rest.contains("//") {
        return url.to_string();
    }
    match Url::parse(rest) {
        Ok(parsed) => format!("{}{}", &url[..url.len() - rest.len()], redact_uri(&parsed)),
        Err(_) => HIDDEN.to_string(),
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let properties = self
            .properties
            .iter()
            .map(|(k, v)| {
                let v = if k == jdbc::PASSWORD { HIDDEN } else { v.as_str() };
                (k.as_str(), v)
            })
            .collect::<BTreeMap<_, _>>();
        f.debug_struct("Destination")
            .field("url", &redact_url(&self.url))
            .field("table", &self.table)
            .field("properties", &properties)
            .finish()
    }
}

impl Destination {
    pub fn new(url: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            table: table.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The backend named by the `driver` property, or else by the URL.
    pub fn backend(&self) -> Result<Backend> {
        match self.property(jdbc::DRIVER) {
            Some(driver) => jdbc::backend_from_driver_class(driver),
            None => jdbc::backend_from_url(&self.url),
        }
    }

    /// Database options for connecting to this destination.
    pub fn database_builder(&self) -> Result<database::Builder> {
        let backend = self.backend()?;
        jdbc::database_builder(
            backend,
            &self.url,
            self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }

    pub fn table_ref(&self) -> Result<TableRef> {
        TableRef::parse(&self.table)
    }
}
