use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use datafusion::prelude::SessionContext;
use serde::Serialize;
use upsert_error::UpsertResult;
use upsert_merge::{MemorySink, TableSink, UpsertSummary, Upserter, XdbcSink};

use crate::job::JobConfig;
use crate::upsert_clap::{Cli, Commands, LogFormat};

/// Result of a `run`.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: UpsertSummary,
    /// The reconciled rows, for dry runs only.
    pub preview: Option<Vec<RecordBatch>>,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    summary: &'a UpsertSummary,
    dry_run: bool,
}

pub async fn execute(cli: &Cli) -> UpsertResult<RunOutcome> {
    match &cli.command {
        Commands::Run(args) => run_job(&args.job, args.dry_run).await,
    }
}

/// Runs `cli` and reports the outcome: the rendered result on `stdout` and
/// exit code 0, or the error with its code on `stderr` and exit code 1.
pub async fn execute_and_report(
    cli: &Cli,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> u8 {
    let result = match execute(cli).await {
        Ok(outcome) => render(&outcome, cli.common_args.log_format),
        Err(err) => Err(err),
    };
    match result {
        Ok(rendered) => {
            let _ = writeln!(stdout, "{rendered}");
            let _ = stdout.flush();
            0
        }
        Err(err) => {
            let _ = writeln!(stderr, "{}", err.pretty());
            1
        }
    }
}

/// Loads `job_path`, reconciles its sources and overwrites its destination,
/// or an in-memory table when `dry_run` is set.
pub async fn run_job(job_path: &Path, dry_run: bool) -> UpsertResult<RunOutcome> {
    let job = JobConfig::load(job_path)?;
    let base_dir = job_path.parent().unwrap_or(Path::new("."));
    tracing::info!(
        job = %job_path.display(),
        destination = ?job.destination,
        dry_run,
        "starting upsert"
    );

    let ctx = SessionContext::new();
    let current = job.current.read(&ctx, base_dir).await?;
    let new = job.new.read(&ctx, base_dir).await?;
    let options = job.options();
    let upserter = Upserter::new(ctx);

    if dry_run {
        let sink = MemorySink::new(job.destination.table.clone());
        let summary = upserter
            .reconcile_and_persist(current, new, &options, Arc::new(sink.clone()))
            .await?;
        let preview = sink.contents().map(|(_, batches)| batches).unwrap_or_default();
        return Ok(RunOutcome {
            summary,
            preview: Some(preview),
        });
    }

    let sink: Arc<dyn TableSink> = Arc::new(XdbcSink::new(job.destination));
    let summary = upserter
        .reconcile_and_persist(current, new, &options, sink)
        .await?;
    Ok(RunOutcome {
        summary,
        preview: None,
    })
}

/// Renders `outcome` for stdout.
pub fn render(outcome: &RunOutcome, format: LogFormat) -> UpsertResult<String> {
    let dry_run = outcome.preview.is_some();
    match format {
        LogFormat::Json => Ok(serde_json::to_string(&Report {
            summary: &outcome.summary,
            dry_run,
        })?),
        LogFormat::Text => {
            let mut out = String::new();
            if let Some(batches) = &outcome.preview {
                out.push_str(&pretty_format_batches(batches)?.to_string());
                out.push('\n');
            }
            out.push_str(&format!("{}: {}", outcome.summary.table, outcome.summary.stats));
            if dry_run {
                out.push_str(" (dry run, destination not modified)");
            }
            Ok(out)
        }
    }
}
