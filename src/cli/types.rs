use std::path::PathBuf;

use clap::{Parser, Subcommand};
use curator::models::Direction;
use curator::validation::clap_id_list_validator;

const HELP_TEMPLATE: &str = "
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}";

#[derive(Parser)]
#[command(name = "curator")]
#[command(about = "Research-data deposit curation CLI", long_about = None)]
#[command(version)]
#[command(help_template = HELP_TEMPLATE)]
#[command(subcommand_help_heading = "Commands")]
pub struct Cli {
    /// Config file (default: $CURATOR_CONFIG, then the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Move deposit folders to another curation stage
    Move {
        /// Direction of the move
        #[arg(short, long, value_enum)]
        direction: Direction,

        /// Stage the folders leave; repeating the same command then reports
        /// "not found" instead of moving again. Required for advance and
        /// revert; finalize always leaves the penultimate stage
        #[arg(
            long,
            value_name = "STAGE",
            required_if_eq_any([("direction", "advance"), ("direction", "revert")])
        )]
        from: Option<String>,

        /// Deposit IDs, comma-separated (e.g. 1001,1002)
        #[arg(required = true, value_parser = clap_id_list_validator)]
        ids: Vec<String>,
    },

    /// Create deposit folders (DATA, ORIGINAL_DATA, METADATA) in the first stage
    Intake {
        /// Deposit IDs, comma-separated
        #[arg(required = true, value_parser = clap_id_list_validator)]
        ids: Vec<String>,

        /// Also download the deposit files into DATA
        #[arg(long)]
        retrieve: bool,
    },

    /// Show the current stage, manifest and README files of deposits
    Status {
        /// Deposit IDs, comma-separated
        #[arg(required = true, value_parser = clap_id_list_validator)]
        ids: Vec<String>,
    },

    /// List deposits awaiting curation
    Pending,

    /// Generate deposit-agreement survey links
    Agreement {
        /// Deposit IDs, comma-separated
        #[arg(required = true, value_parser = clap_id_list_validator)]
        ids: Vec<String>,
    },

    /// Download deposit files into the DATA folder (existing files are kept)
    Retrieve {
        /// Deposit IDs, comma-separated
        #[arg(required = true, value_parser = clap_id_list_validator)]
        ids: Vec<String>,
    },

    /// Report DOIs, or reserve them
    Doi {
        /// Deposit IDs, comma-separated
        #[arg(required = true, value_parser = clap_id_list_validator)]
        ids: Vec<String>,

        /// Reserve a DOI where none is reserved yet
        #[arg(long)]
        reserve: bool,
    },

    /// Generate shell completion script
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("curator").chain(args.iter().copied()))
    }

    #[test]
    fn test_advance_and_revert_need_source_stage() {
        for direction in ["advance", "revert"] {
            let err = parse(&["move", "-d", direction, "1001"]).err().unwrap();
            assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        }

        let cli = parse(&["move", "-d", "advance", "--from", "intake", "1001"]).unwrap();
        match cli.command {
            Commands::Move { from, ids, .. } => {
                assert_eq!(from.as_deref(), Some("intake"));
                assert_eq!(ids, vec!["1001"]);
            }
            _ => panic!("expected move"),
        }
    }

    #[test]
    fn test_finalize_needs_no_source_stage() {
        let cli = parse(&["move", "--direction", "finalize", "1001,1002"]).unwrap();
        match cli.command {
            Commands::Move { direction, from, .. } => {
                assert_eq!(direction, Direction::Finalize);
                assert!(from.is_none());
            }
            _ => panic!("expected move"),
        }
    }

    #[test]
    fn test_retrieve_takes_ids() {
        assert!(parse(&["retrieve"]).is_err());
        assert!(parse(&["retrieve", "1001"]).is_ok());

        match parse(&["intake", "--retrieve", "1001"]).unwrap().command {
            Commands::Intake { retrieve, .. } => assert!(retrieve),
            _ => panic!("expected intake"),
        }
    }
}
