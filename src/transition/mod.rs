//! Stage transition engine
//!
//! Moves a deposit folder between stage directories. The filesystem is the
//! only record of where a deposit is: the current stage is found by
//! scanning every stage directory for the folder, and a move is a single
//! `rename(2)` so the folder is never visible in two stages (or none).
//!
//! Valid transitions:
//! - `Advance`: current -> next stage (not from the terminal stage)
//! - `Revert`: current -> previous stage (not from the first stage)
//! - `Finalize`: penultimate stage -> terminal stage only
//!
//! Every move names the stage the folder is expected to leave (for
//! `Finalize` that is always the penultimate stage). Repeating a call after
//! it succeeded finds nothing at that stage and fails with
//! [`CurationError::NotFound`], which callers treat as "already done"
//! rather than moving the folder again.
//! Two processes racing on the same folder are not coordinated: the rename
//! lets at most one of them win.

use std::fs;
use std::io;

use tracing::{debug, info, info_span, warn};

use crate::error::CurationError;
use crate::fs::permissions::normalize_tree;
use crate::layout::StageLayout;
use crate::models::identity::FolderIdentity;
use crate::models::stage::{Direction, Stage, StageTransitionResult};


pub struct TransitionEngine<'a> {
    layout: &'a StageLayout,
}

impl<'a> TransitionEngine<'a> {
    pub fn new(layout: &'a StageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &'a StageLayout {
        self.layout
    }

    /// Stage whose directory holds the folder, or `None` when no stage does.
    ///
    /// Stages are checked in configured order. Only a real directory counts;
    /// a file or symlink of the same name is ignored here. Finding the folder
    /// in more than one stage is an [`CurationError::AmbiguousState`].
    pub fn locate(&self, identity: &FolderIdentity) -> Result<Option<&'a Stage>, CurationError> {
        let found = self.find_all(identity)?;
        match found.as_slice() {
            [] => Ok(None),
            [stage] => Ok(Some(*stage)),
            _ => Err(ambiguous(identity, &found)),
        }
    }

    fn find_all(&self, identity: &FolderIdentity) -> Result<Vec<&'a Stage>, CurationError> {
        let mut found = Vec::new();

        for stage in self.layout.stages() {
            let candidate = stage.folder_path(identity);
            match fs::symlink_metadata(&candidate) {
                Ok(meta) if meta.is_dir() => found.push(stage),
                Ok(_) => {
                    debug!(path = %candidate.display(), "ignoring non-directory entry");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(CurationError::io(
                        format!("failed to inspect {}", candidate.display()),
                        e,
                    ))
                }
            }
        }

        Ok(found)
    }

    /// Like [`Self::locate`], but a folder in no stage is an error.
    pub fn current_stage(&self, identity: &FolderIdentity) -> Result<&'a Stage, CurationError> {
        self.locate(identity)?.ok_or_else(|| {
            CurationError::NotFound(format!("folder '{identity}' is not in any stage"))
        })
    }

    /// Stage a folder currently in `current` moves to for `direction`.
    pub fn destination(
        &self,
        current: &Stage,
        direction: Direction,
    ) -> Result<&'a Stage, CurationError> {
        match direction {
            Direction::Advance => self.layout.next_stage(current),
            Direction::Revert => self.layout.prev_stage(current),
            Direction::Finalize => {
                let penultimate = self.layout.penultimate();
                if current == penultimate {
                    return Ok(self.layout.terminal());
                }
                Err(CurationError::InvalidTransition {
                    stage: current.name().to_string(),
                    reason: format!("finalize is only allowed from stage '{penultimate}'"),
                })
            }
        }
    }

    /// Move the folder out of `from` in `direction`.
    ///
    /// The source stage is part of the call, so repeating a call that
    /// already succeeded finds nothing in `from` and fails with
    /// [`CurationError::NotFound`] instead of moving the folder again.
    /// Because the source is known, a second copy sitting exactly at the
    /// destination is a [`CurationError::Collision`] rather than an
    /// ambiguous state.
    ///
    /// Nothing on disk changes unless the rename succeeds. Permission
    /// normalization of the moved tree runs afterwards and only warns.
    pub fn transition(
        &self,
        identity: &FolderIdentity,
        from: &Stage,
        direction: Direction,
    ) -> Result<StageTransitionResult, CurationError> {
        let span = info_span!("transition", %identity, %direction, from = %from);
        let _guard = span.enter();

        let found = self.find_all(identity)?;
        self.move_out_of(identity, from, direction, &found)
    }

    /// Move the folder from the penultimate stage into the terminal stage.
    ///
    /// Only the penultimate stage is a legal source. A folder already in the
    /// terminal stage (a repeated finalize) or in no stage at all is
    /// [`CurationError::NotFound`]; a folder sitting in any earlier stage is
    /// an [`CurationError::InvalidTransition`].
    pub fn finalize(
        &self,
        identity: &FolderIdentity,
    ) -> Result<StageTransitionResult, CurationError> {
        let penultimate = self.layout.penultimate();
        let span = info_span!("transition", %identity, direction = %Direction::Finalize);
        let _guard = span.enter();

        let found = self.find_all(identity)?;
        if let [stage] = found.as_slice() {
            if *stage != penultimate && !self.layout.is_terminal(stage) {
                return Err(CurationError::InvalidTransition {
                    stage: stage.name().to_string(),
                    reason: format!("finalize is only allowed from stage '{penultimate}'"),
                });
            }
        }
        self.move_out_of(identity, penultimate, Direction::Finalize, &found)
    }

    fn move_out_of(
        &self,
        identity: &FolderIdentity,
        expected: &Stage,
        direction: Direction,
        found: &[&'a Stage],
    ) -> Result<StageTransitionResult, CurationError> {
        let Some(from) = found.iter().copied().find(|s| *s == expected) else {
            return Err(CurationError::NotFound(match found {
                [] => format!("folder '{identity}' is not in any stage"),
                [stage] => format!("folder '{identity}' is in stage '{stage}', not '{expected}'"),
                _ => format!("folder '{identity}' is not in stage '{expected}'"),
            }));
        };
        let to = self.destination(from, direction)?;

        let others: Vec<&Stage> = found.iter().copied().filter(|s| *s != from).collect();
        match others.as_slice() {
            [] => self.apply(identity, direction, from, to),
            [other] if *other == to => Err(CurationError::Collision {
                identity: identity.to_string(),
                path: to.folder_path(identity),
            }),
            _ => Err(ambiguous(identity, found)),
        }
    }

    fn apply(
        &self,
        identity: &FolderIdentity,
        direction: Direction,
        from: &'a Stage,
        to: &'a Stage,
    ) -> Result<StageTransitionResult, CurationError> {
        let source = from.folder_path(identity);
        let target = to.folder_path(identity);

        // rename(2) would silently replace an empty directory.
        match fs::symlink_metadata(&target) {
            Ok(_) => {
                return Err(CurationError::Collision {
                    identity: identity.to_string(),
                    path: target,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CurationError::io(
                    format!("failed to inspect {}", target.display()),
                    e,
                ))
            }
        }

        fs::rename(&source, &target).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CurationError::NotFound(format!(
                "folder '{identity}' left stage '{from}' before it could be moved"
            )),
            io::ErrorKind::AlreadyExists | io::ErrorKind::DirectoryNotEmpty => {
                CurationError::Collision {
                    identity: identity.to_string(),
                    path: target.clone(),
                }
            }
            _ => CurationError::io(
                format!(
                    "failed to move {} to {}",
                    source.display(),
                    target.display()
                ),
                e,
            ),
        })?;

        info!(from = %from, to = %to, path = %target.display(), "moved deposit folder");

        let report = normalize_tree(&target);
        if report.failed > 0 {
            warn!(failed = report.failed, "moved folder is not fully shared");
        }

        Ok(StageTransitionResult {
            identity: identity.clone(),
            direction,
            from: from.clone(),
            to: to.clone(),
            path: target,
        })
    }
}

fn ambiguous(identity: &FolderIdentity, found: &[&Stage]) -> CurationError {
    CurationError::AmbiguousState {
        identity: identity.to_string(),
        stages: found.iter().map(|s| s.name().to_string()).collect(),
    }
}
