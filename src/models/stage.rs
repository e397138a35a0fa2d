use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::identity::FolderIdentity;

/// One curation stage bound to its base directory.
///
/// Stages are handed out by [`crate::layout::StageLayout`]; `position` is the
/// stage's index in the configured ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stage {
    position: usize,
    name: String,
    base_dir: PathBuf,
}

impl Stage {
    pub(crate) fn new(position: usize, name: String, base_dir: PathBuf) -> Self {
        Self {
            position,
            name,
            base_dir,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path the given deposit folder has while it sits in this stage.
    pub fn folder_path(&self, identity: &FolderIdentity) -> PathBuf {
        self.base_dir.join(identity.as_str())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Requested movement of a deposit folder through the stages.
///
/// - `Advance`: current -> next stage, including penultimate -> terminal
/// - `Revert`: current -> previous stage, including out of the terminal stage
/// - `Finalize`: penultimate stage -> terminal stage, from nowhere else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Advance,
    Revert,
    Finalize,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Advance => write!(f, "advance"),
            Direction::Revert => write!(f, "revert"),
            Direction::Finalize => write!(f, "finalize"),
        }
    }
}

/// Outcome of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransitionResult {
    pub identity: FolderIdentity,
    pub direction: Direction,
    pub from: Stage,
    pub to: Stage,
    /// Final location of the deposit folder.
    pub path: PathBuf,
}
