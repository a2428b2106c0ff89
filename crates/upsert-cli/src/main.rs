use std::io;
use std::process::ExitCode;

use clap::Parser;
use upsert_cli::logging::init_logging;
use upsert_cli::run::execute_and_report;
use upsert_cli::upsert_clap::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.common_args.log_level, cli.common_args.log_format) {
        eprintln!("{}", err.pretty());
        return ExitCode::from(1);
    }

    let tokio_rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to initialize tokio runtime: {err}");
            return ExitCode::from(1);
        }
    };

    let code = tokio_rt.block_on(execute_and_report(
        &cli,
        &mut io::stdout(),
        &mut io::stderr(),
    ));
    ExitCode::from(code)
}
