//! ADBC Driver
//!
//! Drivers are shared libraries loaded once per process and cached by
//! [`Backend`] and [`AdbcVersion`].

use crate::Database;
use crate::database::AdbcDatabase;
use adbc_core::{
    Driver as _,
    driver_manager::ManagedDriver as ManagedAdbcDriver,
    error::{Error, Result, Status},
    options::{AdbcVersion, OptionDatabase, OptionValue},
};
use parking_lot::RwLockUpgradableReadGuard;
use std::{
    collections::HashMap,
    env,
    ffi::c_int,
    fmt::{self, Display},
    hash::Hash,
    path::{Path, PathBuf},
    str::FromStr,
    sync::LazyLock,
};

mod builder;
pub use builder::*;

/// Environment variable naming a directory that holds ADBC driver libraries.
pub const ADBC_LIB_DIR_ENV: &str = "UPSERT_ADBC_LIB_DIR";

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Backend {
    /// PostgreSQL driver implementation (ADBC).
    Postgres,
    /// Redshift, spoken to through the PostgreSQL driver (ADBC).
    Redshift,
    /// Snowflake driver implementation (ADBC).
    Snowflake,
    /// SQLite driver implementation (ADBC).
    Sqlite,
    /// DuckDB, which ships its own ADBC entrypoint.
    DuckDb,
}

impl Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Postgres => write!(f, "PostgreSQL"),
            Backend::Redshift => write!(f, "Redshift"),
            Backend::Snowflake => write!(f, "Snowflake"),
            Backend::Sqlite => write!(f, "SQLite"),
            Backend::DuckDb => write!(f, "DuckDB"),
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    /// Parses a short backend name as accepted in job files (`postgres`,
    /// `redshift`, ...). Matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "redshift" => Ok(Backend::Redshift),
            "snowflake" => Ok(Backend::Snowflake),
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            "duckdb" => Ok(Backend::DuckDb),
            _ => Err(Error::with_message_and_status(
                format!("Unknown backend: {s}"),
                Status::InvalidArguments,
            )),
        }
    }
}

impl Backend {
    pub fn adbc_library_name(&self) -> &'static str {
        match self {
            Backend::Postgres => "adbc_driver_postgresql",
            // todo: swap over to a Redshift specific driver once one is published
            Backend::Redshift => "adbc_driver_postgresql",
            Backend::Snowflake => "adbc_driver_snowflake",
            Backend::Sqlite => "adbc_driver_sqlite",
            Backend::DuckDb => "duckdb",
        }
    }

    pub fn adbc_driver_entrypoint(&self) -> Option<&'static [u8]> {
        match self {
            Backend::Snowflake => Some(b"SnowflakeDriverInit"),
            Backend::DuckDb => Some(b"duckdb_adbc_init"),
            _ => None,
        }
    }

    /// True for backends that take credentials inside a libpq connection URI.
    pub fn is_postgres_family(&self) -> bool {
        matches!(self, Backend::Postgres | Backend::Redshift)
    }
}

/// XDBC Driver.
///
/// A [`Driver`] is a wrapper around a loaded ADBC driver. With a driver, you can create
/// new [`Database`] instances that, in turn, can create new [`Connection`](crate::Connection)
/// instances.
pub trait Driver: Send {
    fn backend(&self) -> Backend;

    fn new_database_with_opts(
        &mut self,
        opts: Vec<(OptionDatabase, OptionValue)>,
    ) -> Result<Box<dyn Database>>;
}

/// A key used to cache loaded ADBC drivers.
#[derive(PartialEq, Eq)]
struct AdbcDriverKey {
    backend: Backend,
    adbc_version: AdbcVersion,
}

impl Hash for AdbcDriverKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.backend.hash(state);
        c_int::from(self.adbc_version).hash(state);
    }
}

/// Searches for subpath starting at `start` and continuing upward through its parents.
///
/// Always checks start. `max_hops = 0` checks `start` only. Does not canonicalize.
pub fn find_upward_dir(start: &Path, subpath: &Path, max_hops: usize) -> Option<PathBuf> {
    if subpath.is_absolute() {
        return None;
    }
    start
        .ancestors()
        .take(max_hops + 1)
        .map(|dir| dir.join(subpath))
        .find(|candidate| candidate.is_dir())
}

/// Resolves the directory searched after the OS loader gives up.
///
/// [`ADBC_LIB_DIR_ENV`] wins; otherwise the first `lib/` directory at or
/// above the running executable.
fn find_adbc_libs_directory() -> Option<PathBuf> {
    // Enough to reach <repo>/lib from <repo>/target/<profile>/deps.
    const LIB_HEIGHT_MAX: usize = 5;

    if let Some(dir) = env::var_os(ADBC_LIB_DIR_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    let starting_dir = env::current_exe().ok()?.parent()?.to_path_buf();
    find_upward_dir(&starting_dir, Path::new("lib"), LIB_HEIGHT_MAX)
}

/// Directory used by [`AdbcDriver::try_load_driver_from_name`].
static ADBC_LIBS_DIRECTORY: LazyLock<Option<PathBuf>> = LazyLock::new(find_adbc_libs_directory);
/// All loaded ADBC drivers are cached in `LOADED_ADBC_DRIVERS`, failures included.
static LOADED_ADBC_DRIVERS: LazyLock<
    parking_lot::RwLock<HashMap<AdbcDriverKey, Result<ManagedAdbcDriver>>>,
> = LazyLock::new(|| parking_lot::RwLock::new(HashMap::new()));

pub(crate) struct AdbcDriver {
    backend: Backend,
    driver: ManagedAdbcDriver,
}

impl AdbcDriver {
    /// Returns an ADBC [`Driver`] for a given [`Backend`] and [`AdbcVersion`].
    pub fn try_load_dynamic(backend: Backend, adbc_version: AdbcVersion) -> Result<Self> {
        Self::try_load_driver_through_cache(backend, adbc_version)
            .map(|driver| Self { backend, driver })
    }

    /// Check the read-through cache of loaded ADBC drivers before loading a new one.
    fn try_load_driver_through_cache(
        backend: Backend,
        adbc_version: AdbcVersion,
    ) -> Result<ManagedAdbcDriver> {
        let key = AdbcDriverKey {
            backend,
            adbc_version,
        };
        let cache = LOADED_ADBC_DRIVERS.upgradable_read();
        if let Some(driver) = cache.get(&key) {
            return driver.clone();
        }
        // Upgrade before loading: the OS loader calls are not thread-safe everywhere.
        let mut cache = RwLockUpgradableReadGuard::upgrade(cache);
        if let Some(driver) = cache.get(&key) {
            return driver.clone();
        }
        let _span = tracy_client::span!("load ADBC driver");
        let driver = Self::try_load_driver_from_name(
            backend.adbc_library_name(),
            backend.adbc_driver_entrypoint(),
            adbc_version,
        );
        match &driver {
            Ok(_) => tracing::debug!(%backend, "loaded ADBC driver"),
            Err(e) => tracing::debug!(%backend, error = %e.message, "failed to load ADBC driver"),
        }
        cache.insert(key, driver.clone());
        driver
    }

    /// Loads a driver library by name.
    ///
    /// The OS gets the first attempt (system path, `LD_LIBRARY_PATH` and friends). If
    /// that fails the library is looked up in [`ADBC_LIBS_DIRECTORY`].
    fn try_load_driver_from_name(
        name: &str,
        entrypoint: Option<&[u8]>,
        adbc_version: AdbcVersion,
    ) -> Result<ManagedAdbcDriver> {
        let res = ManagedAdbcDriver::load_dynamic_from_name(name, entrypoint, adbc_version);
        if res.is_ok() {
            return res;
        }
        match ADBC_LIBS_DIRECTORY.as_ref() {
            Some(libs_dir) => {
                let full_path = libs_dir
                    .join(libloading::library_filename(name))
                    .to_string_lossy()
                    .into_owned();
                ManagedAdbcDriver::load_dynamic_from_filename(full_path, entrypoint, adbc_version)
            }
            None => res,
        }
    }
}

impl Driver for AdbcDriver {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn new_database_with_opts(
        &mut self,
        opts: Vec<(OptionDatabase, OptionValue)>,
    ) -> Result<Box<dyn Database>> {
        let managed_database = self.driver.new_database_with_opts(opts)?;
        Ok(Box::new(AdbcDatabase::new(self.backend, managed_database)))
    }
}
