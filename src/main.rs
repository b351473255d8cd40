use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vending::application::machine::VendingMachine;
use vending::config::MachineConfig;
use vending::domain::ports::Clock;
use vending::infrastructure::clock::SystemClock;
use vending::interfaces::csv::state_writer::StateWriter;
use vending::interfaces::replay::ScriptRunner;

/// Replays a CSV script of vending machine commands and prints the final
/// accounts and products.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input script CSV file
    input: PathBuf,

    #[command(flatten)]
    config: MachineConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let stderr = io::stderr();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(stderr.is_terminal())
        .with_writer(io::stderr)
        .init();

    let machine = VendingMachine::in_memory(&cli.config)?;
    machine.bootstrap(&cli.config).await?;

    let file = File::open(&cli.input).into_diagnostic()?;
    ScriptRunner::new(&machine).run(file).await?;

    let ledger = machine.ledger();
    let accounts = ledger.accounts().list(&|_| true).await?;
    let products = ledger.products().list(&|_| true).await?;

    let stdout = io::stdout();
    let mut writer = StateWriter::new(stdout.lock());
    writer.write_state(accounts, products, SystemClock.now_millis())?;

    Ok(())
}
