//! Curation workflow
//!
//! [`Curator`] ties the pieces together for one invocation: the validated
//! stage layout, the metadata provider, and the per-deposit operations the
//! CLI runs through the batch driver.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::CurationError;
use crate::fs::artifacts::{
    find_readmes, read_manifest, sync_stage, write_agreement_url, write_file_list,
    write_manifest, CurationManifest, MANIFEST_FILE,
};
use crate::fs::permissions::{
    normalize_or_warn, normalize_tree, normalize_tree_with, TreeModes, DIR_MODE,
};
use crate::identity::{resolve_deposit, ResolvedDeposit};
use crate::layout::StageLayout;
use crate::models::deposit::{DepositFile, DepositId, DepositSummary, DepositorRecord};
use crate::models::identity::FolderIdentity;
use crate::models::stage::{Direction, Stage, StageTransitionResult};
use crate::provider::{self, DoiStatus, MetadataSource};
use crate::survey::SurveyLink;
use crate::transition::TransitionEngine;

pub struct Curator {
    config: Config,
    layout: StageLayout,
    source: Box<dyn MetadataSource>,
}

/// Result of [`Curator::intake`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Created {
        identity: FolderIdentity,
        path: PathBuf,
    },
    /// The folder was already in the first stage but lacked parts of its
    /// scaffold; `added` names what was created.
    Completed {
        identity: FolderIdentity,
        path: PathBuf,
        added: Vec<String>,
    },
    /// The folder is already in the pipeline; nothing was touched.
    AlreadyPresent {
        identity: FolderIdentity,
        stage: String,
        path: PathBuf,
    },
}

/// Where a deposit is and what its folder carries.
#[derive(Debug, Clone)]
pub struct DepositStatus {
    pub identity: FolderIdentity,
    pub stage: Option<Stage>,
    pub path: Option<PathBuf>,
    /// Stage recorded in the manifest, if there is one.
    pub manifest_stage: Option<String>,
    pub readmes: Vec<PathBuf>,
}

impl DepositStatus {
    /// Manifest disagrees with the directory the folder is in.
    pub fn is_out_of_sync(&self) -> bool {
        match (&self.stage, &self.manifest_stage) {
            (Some(stage), Some(recorded)) => stage.name() != recorded,
            _ => false,
        }
    }
}

/// Result of [`Curator::retrieve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveReport {
    pub identity: FolderIdentity,
    /// Data folder the files were written to.
    pub path: PathBuf,
    pub downloaded: Vec<String>,
    /// Already present, or link-only.
    pub skipped: Vec<String>,
    /// File name and reason.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct AgreementLink {
    pub url: String,
    /// Where the link was stored; `None` when the deposit has no folder yet.
    pub saved_to: Option<PathBuf>,
}

impl Curator {
    /// Validate the layout and keep the given provider.
    pub fn new(config: Config, source: Box<dyn MetadataSource>) -> Result<Self, CurationError> {
        let layout = StageLayout::from_config(&config.curation)?;
        Ok(Self {
            config,
            layout,
            source,
        })
    }

    /// Validate the layout and build the configured provider.
    pub fn from_config(config: Config) -> Result<Self, CurationError> {
        let source = provider::from_config(&config.provider)?;
        Self::new(config, source)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    pub fn source(&self) -> &dyn MetadataSource {
        self.source.as_ref()
    }

    pub fn engine(&self) -> TransitionEngine<'_> {
        TransitionEngine::new(&self.layout)
    }

    /// Configured stage by name.
    pub fn stage(&self, name: &str) -> Result<&Stage, CurationError> {
        self.layout.stage(name).ok_or_else(|| {
            let known: Vec<&str> = self.layout.stages().iter().map(Stage::name).collect();
            CurationError::Configuration(format!(
                "unknown stage '{name}' (configured: {})",
                known.join(", ")
            ))
        })
    }

    pub fn resolve(&self, id: &DepositId) -> Result<ResolvedDeposit, CurationError> {
        resolve_deposit(id, self.source.as_ref())
    }

    fn metadata_dir(&self) -> &str {
        &self.config.curation.folder_metadata
    }

    /// Move a deposit folder and bring its manifest in line with the new
    /// stage. A manifest problem after the move is only a warning.
    ///
    /// `from` is the stage the folder is expected to leave. It may only be
    /// omitted for `Finalize`, whose source is always the penultimate stage.
    pub fn move_deposit(
        &self,
        id: &DepositId,
        direction: Direction,
        from: Option<&Stage>,
    ) -> Result<StageTransitionResult, CurationError> {
        let from = match (from, direction) {
            (Some(stage), _) => Some(stage),
            (None, Direction::Finalize) => None,
            (None, _) => {
                return Err(CurationError::Configuration(format!(
                    "{direction} needs the stage the folder leaves (--from)"
                )))
            }
        };

        let resolved = self.resolve(id)?;
        let engine = self.engine();
        let result = match from {
            Some(stage) => engine.transition(&resolved.identity, stage, direction)?,
            None => engine.finalize(&resolved.identity)?,
        };

        match sync_stage(&result.path, self.metadata_dir(), result.to.name()) {
            Ok(true) => debug!("manifest updated"),
            Ok(false) => {}
            Err(e) => warn!(error = %format!("{e:#}"), "moved, but the manifest was not updated"),
        }

        Ok(result)
    }

    /// Create the deposit folder scaffold in the first stage.
    ///
    /// If the folder already exists in a later stage, nothing is touched. A
    /// folder already in the first stage gets whatever sub-folders or
    /// manifest it is missing, so an interrupted intake can be finished by
    /// running it again.
    pub fn intake(&self, id: &DepositId) -> Result<IntakeOutcome, CurationError> {
        let ResolvedDeposit { identity, record } = self.resolve(id)?;
        let first = self.layout.first();

        if let Some(stage) = self.engine().locate(&identity)? {
            let path = stage.folder_path(&identity);
            if stage != first {
                warn!(%identity, stage = %stage, "folder already in the pipeline, not creating");
                return Ok(IntakeOutcome::AlreadyPresent {
                    identity,
                    stage: stage.name().to_string(),
                    path,
                });
            }

            let mut added = self.scaffold(&path)?;
            if self.ensure_manifest(&path, &record, &identity, first) {
                added.push(MANIFEST_FILE.to_string());
            }
            if added.is_empty() {
                return Ok(IntakeOutcome::AlreadyPresent {
                    identity,
                    stage: stage.name().to_string(),
                    path,
                });
            }
            info!(%identity, added = ?added, "completed partial deposit folder");
            return Ok(IntakeOutcome::Completed {
                identity,
                path,
                added,
            });
        }

        let folder = first.folder_path(&identity);
        // create_dir, not create_dir_all: a concurrent intake must not be
        // silently merged into ours.
        fs::create_dir(&folder).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => CurationError::Collision {
                identity: identity.to_string(),
                path: folder.clone(),
            },
            _ => CurationError::io(format!("failed to create {}", folder.display()), e),
        })?;
        normalize_or_warn(&folder, DIR_MODE);

        self.scaffold(&folder)?;
        self.ensure_manifest(&folder, &record, &identity, first);

        info!(%identity, stage = %first, "deposit folder created");
        Ok(IntakeOutcome::Created {
            identity,
            path: folder,
        })
    }

    /// Create the missing sub-folders of `folder`; returns the names created.
    fn scaffold(&self, folder: &Path) -> Result<Vec<String>, CurationError> {
        let folders = self.config.curation.deposit_folders();
        let mut added = Vec::new();
        for name in [folders.data, folders.original_data, folders.metadata] {
            let sub = folder.join(&name);
            if sub.is_dir() {
                continue;
            }
            fs::create_dir(&sub)
                .map_err(|e| CurationError::io(format!("failed to create {}", sub.display()), e))?;
            normalize_or_warn(&sub, DIR_MODE);
            added.push(name);
        }
        Ok(added)
    }

    /// Write the manifest unless one is already there. Returns whether it
    /// was written; a failure is only a warning.
    fn ensure_manifest(
        &self,
        folder: &Path,
        record: &DepositorRecord,
        identity: &FolderIdentity,
        stage: &Stage,
    ) -> bool {
        if matches!(read_manifest(folder, self.metadata_dir()), Ok(Some(_))) {
            return false;
        }
        let manifest = CurationManifest::new(record, identity, stage.name());
        match write_manifest(folder, self.metadata_dir(), &manifest) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "folder has no manifest");
                false
            }
        }
    }

    /// Download the deposit's files into the data folder of its current
    /// stage.
    ///
    /// The provider's file list is saved next to the manifest. Files that
    /// are already present are never overwritten, and a file that fails is
    /// recorded without stopping the others. The data folder is left
    /// read-only afterwards.
    pub fn retrieve(&self, id: &DepositId) -> Result<RetrieveReport, CurationError> {
        let ResolvedDeposit { identity, .. } = self.resolve(id)?;
        let folder = self.engine().current_stage(&identity)?.folder_path(&identity);

        let data = folder.join(&self.config.curation.folder_data);
        if data.is_dir() {
            // A previous retrieval left it read-only.
            normalize_tree(&data);
        } else {
            fs::create_dir(&data)
                .map_err(|e| CurationError::io(format!("failed to create {}", data.display()), e))?;
            normalize_or_warn(&data, DIR_MODE);
        }

        let files = self.source.list_files(id)?;
        if let Err(e) = write_file_list(&folder, self.metadata_dir(), &files) {
            warn!(error = %format!("{e:#}"), "file list not saved");
        }

        let mut report = RetrieveReport {
            identity,
            path: data.clone(),
            downloaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };

        for file in &files {
            if file.is_link_only {
                debug!(file = %file.name, "link-only file, nothing to download");
                report.skipped.push(file.name.clone());
                continue;
            }
            let Some(name) = plain_file_name(&file.name) else {
                warn!(file = %file.name, "refusing file name that is not a plain name");
                report
                    .failed
                    .push((file.name.clone(), "not a plain file name".to_string()));
                continue;
            };

            let target = data.join(name);
            if fs::symlink_metadata(&target).is_ok() {
                debug!(file = %name, "already present, keeping it");
                report.skipped.push(name.to_string());
                continue;
            }

            match self.download_to(file, &data, &target) {
                Ok(Some(bytes)) => {
                    info!(file = %name, bytes, "downloaded");
                    report.downloaded.push(name.to_string());
                }
                Ok(None) => report.skipped.push(name.to_string()),
                Err(e) => {
                    warn!(file = %name, error = %e, "download failed");
                    report.failed.push((name.to_string(), e.to_string()));
                }
            }
        }

        normalize_tree_with(&data, TreeModes::READ_ONLY);
        info!(
            identity = %report.identity,
            downloaded = report.downloaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "retrieval finished"
        );
        Ok(report)
    }

    /// Download through a temporary file in `dir`, then link it into place
    /// unless `target` appeared meanwhile (`Ok(None)`).
    fn download_to(
        &self,
        file: &DepositFile,
        dir: &Path,
        target: &Path,
    ) -> Result<Option<u64>, CurationError> {
        let mut partial = NamedTempFile::new_in(dir)
            .map_err(|e| CurationError::io(format!("failed to create a file in {}", dir.display()), e))?;
        let bytes = self.source.download_file(file, partial.as_file_mut())?;

        match partial.persist_noclobber(target) {
            Ok(_) => Ok(Some(bytes)),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(CurationError::io(
                format!("failed to write {}", target.display()),
                e.error,
            )),
        }
    }

    pub fn status(&self, id: &DepositId) -> Result<DepositStatus, CurationError> {
        let resolved = self.resolve(id)?;
        let identity = resolved.identity;

        let Some(stage) = self.engine().locate(&identity)? else {
            return Ok(DepositStatus {
                identity,
                stage: None,
                path: None,
                manifest_stage: None,
                readmes: Vec::new(),
            });
        };

        let path = stage.folder_path(&identity);
        let manifest_stage = match read_manifest(&path, self.metadata_dir()) {
            Ok(manifest) => manifest.map(|m| m.stage),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "unreadable manifest");
                None
            }
        };
        let readmes = find_readmes(&path).unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "README search failed");
            Vec::new()
        });

        Ok(DepositStatus {
            identity,
            stage: Some(stage.clone()),
            path: Some(path),
            manifest_stage,
            readmes,
        })
    }

    pub fn pending(&self) -> Result<Vec<DepositSummary>, CurationError> {
        Ok(self.source.list_pending()?)
    }

    /// Generate the survey link and store it in the deposit folder, if any.
    pub fn agreement(
        &self,
        id: &DepositId,
        link: &SurveyLink,
    ) -> Result<AgreementLink, CurationError> {
        let ResolvedDeposit { identity, record } = self.resolve(id)?;
        let url = link.generate_url(&record).to_string();

        let saved_to = match self.engine().locate(&identity)? {
            Some(stage) => Some(
                write_agreement_url(&stage.folder_path(&identity), self.metadata_dir(), &url)
                    .map_err(CurationError::Artifact)?,
            ),
            None => None,
        };

        Ok(AgreementLink { url, saved_to })
    }

    /// Report the DOI, reserving one first when `reserve` is set.
    pub fn doi(&self, id: &DepositId, reserve: bool) -> Result<DoiStatus, CurationError> {
        if reserve {
            let doi = self.source.reserve_doi(id)?;
            return Ok(DoiStatus::Reserved(doi));
        }
        Ok(self.source.doi_status(id)?)
    }
}

/// `name` if it is a single normal path component.
fn plain_file_name(name: &str) -> Option<&str> {
    let mut parts = Path::new(name).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(_)), None) => Some(name.trim_end_matches('/')),
        _ => None,
    }
}
