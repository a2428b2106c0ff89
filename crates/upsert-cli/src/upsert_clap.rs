use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

static ABOUT: LazyLock<String> = LazyLock::new(|| {
    format!(
        "upsert {}: reconcile two datasets by primary key and overwrite a table",
        env!("CARGO_PKG_VERSION")
    )
});

// ----------------------------------------------------------------------------------------------
// Cli and its subcommands

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    name = "upsert",
    version = env!("CARGO_PKG_VERSION"),
    about = &**ABOUT,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub common_args: CommonArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Reconcile the job's datasets and overwrite its destination table
    Run(RunArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the job file (TOML)
    #[arg(long, short = 'j')]
    pub job: PathBuf,

    /// Reconcile and print the result without touching the destination
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Log level; RUST_LOG overrides it
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LevelFilter,

    /// Log and summary output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run() {
        let cli = Cli::try_parse_from([
            "upsert",
            "run",
            "--job",
            "job.toml",
            "--dry-run",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command;
        assert_eq!(args.job, PathBuf::from("job.toml"));
        assert!(args.dry_run);
        assert_eq!(cli.common_args.log_level, LevelFilter::DEBUG);
        assert_eq!(cli.common_args.log_format, LogFormat::Json);
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["upsert", "run", "-j", "job.toml"]).unwrap();
        let Commands::Run(args) = cli.command;
        assert!(!args.dry_run);
        assert_eq!(cli.common_args.log_level, LevelFilter::INFO);
        assert_eq!(cli.common_args.log_format, LogFormat::Text);
    }

    #[test]
    fn job_is_required() {
        assert!(Cli::try_parse_from(["upsert", "run"]).is_err());
    }
}
