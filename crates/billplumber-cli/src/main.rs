mod archive;
mod batch;
mod cli;
mod password;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

use crate::batch::{RunContext, run_batch};
use crate::password::ChainedSource;

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.table_settings();
    let mut source = ChainedSource::from_cli(cli.passwords);
    let mut ctx = RunContext {
        password: None,
        source: &mut source,
        settings,
        output: cli.output,
        report: !cli.no_report,
    };
    let outcome = run_batch(&cli.input, &mut ctx)?;
    tracing::info!(
        documents = outcome.documents,
        skipped_archives = outcome.skipped_archives,
        merged = outcome.merged,
        "batch finished"
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
