mod cli;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

/// Exits non-zero only for argument and configuration errors; per-deposit
/// failures are reported in the batch summary.
fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::dispatch(cli)
}
