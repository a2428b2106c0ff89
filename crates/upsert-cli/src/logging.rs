use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use upsert_error::{UpsertResult, unexpected_upsert_err};

use crate::upsert_clap::LogFormat;

/// Installs the global `tracing` subscriber. Logs go to stderr so stdout
/// carries only results.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: LevelFilter, format: LogFormat) -> UpsertResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| unexpected_upsert_err!("Failed to initialize logging: {e}"))
}
