use clap::Parser;

use rusty_cqd::cli::Cli;
use rusty_cqd::{CqdApp, RunConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Cli::parse();
    let config = RunConfig::with_cli_args(&args)?;

    let outcome = CqdApp::new(config).run()?;
    println!("Wrote {} sample reports", outcome.reports.len());
    Ok(())
}
