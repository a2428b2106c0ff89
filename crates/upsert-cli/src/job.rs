//! Job files.
//!
//! ```toml
//! primary_keys = ["id"]
//! compare_columns = ["name", "email"]   # default: every shared non-key column
//! null_equality = "null_safe"           # or "never_equal"
//! check_unique_keys = true
//!
//! [current]
//! path = "exports/customers.parquet"
//!
//! [new]
//! path = "incoming/customers.csv"
//!
//! [destination]
//! url = "jdbc:postgresql://warehouse:5432/analytics"
//! table = "public.customers"
//!
//! [destination.properties]
//! user = "${PGUSER}"
//! password = "${PGPASSWORD}"
//! ```
//!
//! Relative source paths are resolved against the job file's directory.

use std::path::{Path, PathBuf};

use datafusion::prelude::{CsvReadOptions, DataFrame, ParquetReadOptions, SessionContext};
use serde::Deserialize;
use upsert_error::{ErrorCode, UpsertResult, err, upsert_err};
use upsert_merge::{NullEquality, UpsertOptions};
use upsert_xdbc::Destination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Parquet,
}

impl SourceFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Inferred from the file extension when absent.
    #[serde(default)]
    pub format: Option<SourceFormat>,
}

impl SourceConfig {
    pub fn format(&self) -> UpsertResult<SourceFormat> {
        match self.format.or_else(|| SourceFormat::from_path(&self.path)) {
            Some(format) => Ok(format),
            None => err!(
                ErrorCode::UnsupportedFileFormat,
                "Cannot infer the format of '{}'; set `format` to \"csv\" or \"parquet\"",
                self.path.display()
            ),
        }
    }

    /// Registers the source with `ctx` as a lazy DataFrame.
    pub async fn read(&self, ctx: &SessionContext, base_dir: &Path) -> UpsertResult<DataFrame> {
        let format = self.format()?;
        let path = base_dir.join(&self.path);
        if !path.is_file() {
            return err!(
                ErrorCode::IoError,
                "Source file '{}' does not exist",
                path.display()
            );
        }
        let Some(path) = path.to_str() else {
            return err!(
                ErrorCode::InvalidArgument,
                "Source path '{}' is not valid UTF-8",
                path.display()
            );
        };
        tracing::debug!(path, ?format, "reading source");
        let df = match format {
            SourceFormat::Csv => ctx.read_csv(path, CsvReadOptions::new()).await?,
            SourceFormat::Parquet => ctx.read_parquet(path, ParquetReadOptions::default()).await?,
        };
        Ok(df)
    }
}

fn default_check_unique_keys() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub current: SourceConfig,
    pub new: SourceConfig,
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub compare_columns: Option<Vec<String>>,
    #[serde(default)]
    pub null_equality: NullEquality,
    #[serde(default = "default_check_unique_keys")]
    pub check_unique_keys: bool,
    pub destination: Destination,
}

impl JobConfig {
    /// Parses a job file and expands `${VAR}` references in the destination.
    pub fn from_toml(contents: &str) -> UpsertResult<Self> {
        let mut job: JobConfig = toml::from_str(contents)?;
        job.destination.url = expand("url", &job.destination.url)?;
        for (key, value) in job.destination.properties.iter_mut() {
            *value = expand(key, value)?;
        }
        Ok(job)
    }

    pub fn load(path: &Path) -> UpsertResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            upsert_err!(
                ErrorCode::IoError,
                "Failed to read job file '{}': {e}",
                path.display()
            )
        })?;
        Self::from_toml(&contents)
            .map_err(|e| Box::new(e.with_context(format!("Invalid job file '{}'", path.display()))))
    }

    pub fn options(&self) -> UpsertOptions {
        let options = UpsertOptions::new(self.primary_keys.iter().cloned())
            .with_null_equality(self.null_equality)
            .with_check_unique_keys(self.check_unique_keys);
        match &self.compare_columns {
            Some(columns) => options.with_compare_columns(columns.iter().cloned()),
            None => options,
        }
    }
}

fn expand(key: &str, value: &str) -> UpsertResult<String> {
    match shellexpand::env(value) {
        Ok(expanded) => Ok(expanded.into_owned()),
        Err(e) => err!(
            ErrorCode::InvalidConfig,
            "Destination property '{key}' references an undefined environment variable '{}'",
            e.var_name
        ),
    }
}
