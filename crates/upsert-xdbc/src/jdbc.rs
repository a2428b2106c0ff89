//! Translation of JDBC-style connection descriptors.
//!
//! Jobs describe their destination the way JDBC tools do: a `jdbc:` URL plus
//! a property bag with `user`, `password` and an optional `driver` class.
//! This module maps those onto a [`Backend`] and a [`database::Builder`].

use adbc_core::error::{Error, Result, Status};
use url::Url;

use crate::{Backend, database, snowflake};

/// Property naming the JDBC driver class (or a short backend name).
pub const DRIVER: &str = "driver";
/// Property holding the user name.
pub const USER: &str = "user";
/// Property holding the password.
pub const PASSWORD: &str = "password";

fn invalid(message: impl Into<String>) -> Error {
    Error::with_message_and_status(message, Status::InvalidArguments)
}

/// Resolves a JDBC driver class such as `org.postgresql.Driver`.
///
/// Short backend names (`postgres`, `sqlite`, ...) are accepted too.
pub fn backend_from_driver_class(class: &str) -> Result<Backend> {
    match class.trim() {
        "org.postgresql.Driver" => Ok(Backend::Postgres),
        "com.amazon.redshift.jdbc.Driver" | "com.amazon.redshift.jdbc42.Driver" => {
            Ok(Backend::Redshift)
        }
        "net.snowflake.client.jdbc.SnowflakeDriver" => Ok(Backend::Snowflake),
        "org.sqlite.JDBC" => Ok(Backend::Sqlite),
        "org.duckdb.DuckDBDriver" => Ok(Backend::DuckDb),
        other => other
            .parse::<Backend>()
            .map_err(|_| invalid(format!("Unsupported driver: {other}"))),
    }
}

/// Splits `jdbc:<subprotocol>:<rest>` into its subprotocol and remainder.
///
/// The `jdbc:` prefix is optional.
fn split_url(url: &str) -> Result<(String, &str)> {
    let trimmed = url.trim();
    let without_prefix = trimmed.strip_prefix("jdbc:").unwrap_or(trimmed);
    match without_prefix.split_once(':') {
        Some((subprotocol, rest)) if !subprotocol.is_empty() => {
            Ok((subprotocol.to_ascii_lowercase(), rest))
        }
        _ => Err(invalid(format!("Malformed connection URL: {url}"))),
    }
}

/// Resolves the backend named by the URL subprotocol.
pub fn backend_from_url(url: &str) -> Result<Backend> {
    let (subprotocol, _) = split_url(url)?;
    subprotocol
        .parse::<Backend>()
        .map_err(|_| invalid(format!("Unsupported URL scheme: {subprotocol}")))
}

/// Builds the database options for `backend` from a JDBC URL and properties.
///
/// `user` and `password` become credentials and `driver` is dropped.
/// Remaining properties are forwarded as driver options, and the
/// PostgreSQL-family backends receive them as connection-string parameters.
pub fn database_builder<'a>(
    backend: Backend,
    url: &str,
    properties: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<database::Builder> {
    let (_, rest) = split_url(url)?;
    let mut builder = database::Builder::new(backend);
    let mut extra = Vec::new();
    for (key, value) in properties {
        match key {
            USER => {
                builder.with_username(value);
            }
            PASSWORD => {
                builder.with_password(value);
            }
            DRIVER => {}
            _ => extra.push((key, value)),
        }
    }

    match backend {
        Backend::Postgres | Backend::Redshift => postgres_options(&mut builder, url, rest, extra)?,
        Backend::Snowflake => snowflake_options(&mut builder, url, rest, extra)?,
        Backend::Sqlite => {
            // The SQLite driver takes plain paths and `:memory:`, which are not URLs.
            let path = if rest.is_empty() { ":memory:" } else { rest };
            builder.with_named_option("uri", path)?;
            for (key, value) in extra {
                builder.with_named_option(key, value)?;
            }
        }
        Backend::DuckDb => {
            if !rest.is_empty() && rest != ":memory:" {
                builder.with_named_option("path", rest)?;
            }
            for (key, value) in extra {
                builder.with_named_option(key, value)?;
            }
        }
    }
    Ok(builder)
}

fn postgres_options(
    builder: &mut database::Builder,
    url: &str,
    rest: &str,
    extra: Vec<(&str, &str)>,
) -> Result<()> {
    if !rest.starts_with("//") {
        return Err(invalid(format!(
            "Expected a URL of the form jdbc:postgresql://host[:port]/database, got {url}"
        )));
    }
    let mut uri = Url::parse(&format!("postgresql:{rest}"))
        .map_err(|e| invalid(format!("Invalid connection URL {url}: {e}")))?;

    // JDBC's `ssl=true` is spelled `sslmode=require` in libpq.
    let params = uri
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .chain(extra.into_iter().map(|(k, v)| (k.to_string(), v.to_string())))
        .collect::<Vec<_>>();
    let mut translated = Vec::with_capacity(params.len());
    for (key, value) in params {
        match key.as_str() {
            USER => {
                builder.with_username(value);
            }
            PASSWORD => {
                builder.with_password(value);
            }
            "ssl" if value.eq_ignore_ascii_case("true") => {
                translated.push(("sslmode".to_string(), "require".to_string()));
            }
            "ssl" => {}
            _ => translated.push((key, value)),
        }
    }
    if translated.is_empty() {
        uri.set_query(None);
    } else {
        uri.query_pairs_mut().clear().extend_pairs(translated);
    }
    builder.with_uri(uri);
    Ok(())
}

fn snowflake_options(
    builder: &mut database::Builder,
    url: &str,
    rest: &str,
    extra: Vec<(&str, &str)>,
) -> Result<()> {
    let uri = Url::parse(&format!("snowflake:{rest}"))
        .map_err(|e| invalid(format!("Invalid connection URL {url}: {e}")))?;
    let host = uri
        .host_str()
        .ok_or_else(|| invalid(format!("Missing Snowflake account host in {url}")))?;
    let account = host.strip_suffix(snowflake::HOST_SUFFIX).unwrap_or(host);
    builder.with_named_option(snowflake::ACCOUNT, account)?;

    let query = uri
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect::<Vec<_>>();
    let extra = extra
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()));
    for (key, value) in query.into_iter().chain(extra) {
        match key.as_str() {
            USER => {
                builder.with_username(value);
            }
            PASSWORD => {
                builder.with_password(value);
            }
            _ => {
                builder.with_named_option(snowflake::option_for_jdbc_property(&key), value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adbc_core::options::{OptionDatabase, OptionValue};
    use pretty_assertions::assert_eq;

    const NO_PROPERTIES: [(&str, &str); 0] = [];

    fn named(builder: &database::Builder, name: &str) -> Option<String> {
        builder.other.iter().find_map(|(k, v)| match (k, v) {
            (OptionDatabase::Other(k), OptionValue::String(v)) if k == name => Some(v.clone()),
            _ => None,
        })
    }

    #[test]
    fn driver_classes() {
        assert_eq!(
            backend_from_driver_class("org.postgresql.Driver").unwrap(),
            Backend::Postgres
        );
        assert_eq!(
            backend_from_driver_class("com.amazon.redshift.jdbc42.Driver").unwrap(),
            Backend::Redshift
        );
        assert_eq!(
            backend_from_driver_class("org.sqlite.JDBC").unwrap(),
            Backend::Sqlite
        );
        assert_eq!(backend_from_driver_class("duckdb").unwrap(), Backend::DuckDb);
        let err = backend_from_driver_class("com.mysql.cj.jdbc.Driver").unwrap_err();
        assert_eq!(err.status, Status::InvalidArguments);
    }

    #[test]
    fn url_schemes() {
        assert_eq!(
            backend_from_url("jdbc:postgresql://h:5432/db").unwrap(),
            Backend::Postgres
        );
        assert_eq!(
            backend_from_url("jdbc:redshift://c.x.redshift.amazonaws.com:5439/dev").unwrap(),
            Backend::Redshift
        );
        assert_eq!(backend_from_url("sqlite:/tmp/x.db").unwrap(), Backend::Sqlite);
        assert!(backend_from_url("jdbc:oracle:thin:@h:1521:orcl").is_err());
        assert!(backend_from_url("not a url").is_err());
    }

    #[test]
    fn postgres_url_and_properties() -> Result<()> {
        let builder = database_builder(
            Backend::Postgres,
            "jdbc:postgresql://aurora.local:5432/warehouse?ssl=true",
            [
                ("user", "loader"),
                ("password", "secret"),
                ("driver", "org.postgresql.Driver"),
                ("application_name", "upsert"),
            ],
        )?;
        assert_eq!(builder.username.as_deref(), Some("loader"));
        assert_eq!(builder.password.as_deref(), Some("secret"));
        assert_eq!(
            builder.uri.as_ref().map(Url::as_str),
            Some("postgresql://aurora.local:5432/warehouse?sslmode=require&application_name=upsert")
        );
        assert!(builder.other.is_empty());
        Ok(())
    }

    #[test]
    fn redshift_speaks_postgres() -> Result<()> {
        let builder = database_builder(
            Backend::Redshift,
            "jdbc:redshift://cluster.example:5439/dev",
            NO_PROPERTIES,
        )?;
        assert_eq!(
            builder.uri.as_ref().map(Url::as_str),
            Some("postgresql://cluster.example:5439/dev")
        );
        Ok(())
    }

    #[test]
    fn postgres_requires_host() {
        let err = database_builder(Backend::Postgres, "jdbc:postgresql:warehouse", NO_PROPERTIES).unwrap_err();
        assert_eq!(err.status, Status::InvalidArguments);
    }

    #[test]
    fn snowflake_url() -> Result<()> {
        let builder = database_builder(
            Backend::Snowflake,
            "jdbc:snowflake://acme-eu1.snowflakecomputing.com/?warehouse=LOAD_WH&db=RAW",
            [("user", "loader"), ("role", "LOADER")],
        )?;
        assert_eq!(named(&builder, snowflake::ACCOUNT).as_deref(), Some("acme-eu1"));
        assert_eq!(named(&builder, snowflake::WAREHOUSE).as_deref(), Some("LOAD_WH"));
        assert_eq!(named(&builder, snowflake::DATABASE).as_deref(), Some("RAW"));
        assert_eq!(named(&builder, snowflake::ROLE).as_deref(), Some("LOADER"));
        assert_eq!(builder.username.as_deref(), Some("loader"));
        Ok(())
    }

    #[test]
    fn file_backends() -> Result<()> {
        let sqlite = database_builder(Backend::Sqlite, "jdbc:sqlite:/var/lib/app.db", NO_PROPERTIES)?;
        assert_eq!(named(&sqlite, "uri").as_deref(), Some("/var/lib/app.db"));

        let memory = database_builder(Backend::Sqlite, "jdbc:sqlite::memory:", NO_PROPERTIES)?;
        assert_eq!(named(&memory, "uri").as_deref(), Some(":memory:"));

        let duck = database_builder(Backend::DuckDb, "jdbc:duckdb:", NO_PROPERTIES)?;
        assert!(duck.other.is_empty());
        Ok(())
    }
}
