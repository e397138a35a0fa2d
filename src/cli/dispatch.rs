use std::io;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use clap::CommandFactory;
use curator::commands::common::CommandContext;
use curator::commands::{agreement, doi, intake, pending, retrieve, status, transition};
use curator::completions::{generate_completions, Shell};
use curator::validation::parse_deposit_ids;
use curator::workflow::Curator;

use super::types::{Cli, Commands};

/// Run one parsed command line.
///
/// Deposit IDs are validated before the config is read, so an argument
/// error never reaches the stage directories.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Move {
            direction,
            from,
            ids,
        } => {
            let ids = parse_deposit_ids(&ids)?;
            with_curator(config, |curator| {
                transition::execute(curator, &ids, direction, from.as_deref()).map(drop)
            })
        }
        Commands::Intake { ids, retrieve } => {
            let ids = parse_deposit_ids(&ids)?;
            with_curator(config, |curator| {
                intake::execute(curator, &ids, retrieve).map(drop)
            })
        }
        Commands::Status { ids } => {
            let ids = parse_deposit_ids(&ids)?;
            with_curator(config, |curator| status::execute(curator, &ids).map(drop))
        }
        Commands::Pending => with_curator(config, pending::execute),
        Commands::Agreement { ids } => {
            let ids = parse_deposit_ids(&ids)?;
            with_curator(config, |curator| agreement::execute(curator, &ids).map(drop))
        }
        Commands::Retrieve { ids } => {
            let ids = parse_deposit_ids(&ids)?;
            with_curator(config, |curator| retrieve::execute(curator, &ids).map(drop))
        }
        Commands::Doi { ids, reserve } => {
            let ids = parse_deposit_ids(&ids)?;
            with_curator(config, |curator| doi::execute(curator, &ids, reserve).map(drop))
        }
        Commands::Completions { shell } => {
            let shell = Shell::from_str(&shell)?;
            let mut cmd = Cli::command();
            generate_completions(&mut cmd, shell, &mut io::stdout());
            Ok(())
        }
    }
}

fn with_curator<F>(config: Option<&Path>, run: F) -> Result<()>
where
    F: FnOnce(&Curator) -> Result<()>,
{
    let context = CommandContext::load(config)?;
    run(&context.curator)
}
