//! Generated metadata artifacts inside a deposit folder
//!
//! Layout under `<deposit folder>/<metadata folder>/`:
//! - `curation.json` - manifest recording the stage the folder is filed under
//! - `agreement_url.txt` - pre-filled deposit agreement link
//! - `file_list_original.json` - provider file listing saved at retrieval
//!
//! The manifest is rewritten after every successful transition so its
//! `stage` always names the directory the folder currently lives in.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::locking::{locked_read, locked_update, locked_write};
use super::permissions::{normalize_or_warn, DIR_MODE, FILE_MODE};
use crate::models::deposit::{DepositFile, DepositId, DepositorRecord};
use crate::models::identity::FolderIdentity;

pub const MANIFEST_FILE: &str = "curation.json";
pub const AGREEMENT_FILE: &str = "agreement_url.txt";
pub const FILE_LIST_FILE: &str = "file_list_original.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationManifest {
    pub deposit_id: DepositId,
    pub identity: String,
    pub depositor: String,
    pub title: String,
    pub stage: String,
    pub updated_at: DateTime<Utc>,
}

impl CurationManifest {
    pub fn new(record: &DepositorRecord, identity: &FolderIdentity, stage: &str) -> Self {
        Self {
            deposit_id: record.deposit_id.clone(),
            identity: identity.to_string(),
            depositor: record.depositor_name.clone(),
            title: record.title.clone(),
            stage: stage.to_string(),
            updated_at: Utc::now(),
        }
    }
}

pub fn manifest_path(folder: &Path, metadata_dir: &str) -> PathBuf {
    folder.join(metadata_dir).join(MANIFEST_FILE)
}

fn ensure_metadata_dir(folder: &Path, metadata_dir: &str) -> Result<PathBuf> {
    let dir = folder.join(metadata_dir);
    if !dir.is_dir() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create metadata folder: {}", dir.display()))?;
        normalize_or_warn(&dir, DIR_MODE);
    }
    Ok(dir)
}

/// Write (or replace) the manifest of a deposit folder.
pub fn write_manifest(
    folder: &Path,
    metadata_dir: &str,
    manifest: &CurationManifest,
) -> Result<PathBuf> {
    ensure_metadata_dir(folder, metadata_dir)?;
    let path = manifest_path(folder, metadata_dir);
    let content =
        serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
    locked_write(&path, &content)?;
    normalize_or_warn(&path, FILE_MODE);
    Ok(path)
}

/// Load the manifest, or `None` if the folder has none yet.
pub fn read_manifest(folder: &Path, metadata_dir: &str) -> Result<Option<CurationManifest>> {
    let path = manifest_path(folder, metadata_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = locked_read(&path)?;
    let manifest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
    Ok(Some(manifest))
}

/// Record `stage` in an existing manifest.
///
/// Returns `Ok(false)` when there is no manifest or it already names `stage`.
pub fn sync_stage(folder: &Path, metadata_dir: &str, stage: &str) -> Result<bool> {
    let path = manifest_path(folder, metadata_dir);
    if !path.exists() {
        return Ok(false);
    }

    let changed = locked_update(&path, |current| {
        let mut manifest: CurationManifest = serde_json::from_str(current)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        if manifest.stage == stage {
            return Ok(None);
        }
        manifest.stage = stage.to_string();
        manifest.updated_at = Utc::now();
        Ok(Some(serde_json::to_string_pretty(&manifest)?))
    })?;

    if changed {
        normalize_or_warn(&path, FILE_MODE);
    }
    Ok(changed)
}

/// Store the deposit agreement link next to the manifest.
pub fn write_agreement_url(folder: &Path, metadata_dir: &str, url: &str) -> Result<PathBuf> {
    let dir = ensure_metadata_dir(folder, metadata_dir)?;
    let path = dir.join(AGREEMENT_FILE);
    locked_write(&path, &format!("{url}\n"))?;
    normalize_or_warn(&path, FILE_MODE);
    Ok(path)
}

/// Save the provider's file listing as retrieved.
pub fn write_file_list(folder: &Path, metadata_dir: &str, files: &[DepositFile]) -> Result<PathBuf> {
    let dir = ensure_metadata_dir(folder, metadata_dir)?;
    let path = dir.join(FILE_LIST_FILE);
    let content = serde_json::to_string_pretty(files).context("Failed to serialize file list")?;
    locked_write(&path, &content)?;
    normalize_or_warn(&path, FILE_MODE);
    Ok(path)
}

/// Every file under `folder` whose name contains `README` (any case).
pub fn find_readmes(folder: &Path) -> Result<Vec<PathBuf>> {
    let root = folder
        .to_str()
        .with_context(|| format!("Folder path is not valid UTF-8: {}", folder.display()))?;
    let pattern = format!("{}/**/*", glob::Pattern::escape(root));

    let mut found = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid README search pattern")? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during README search");
                continue;
            }
        };
        let is_readme = path
            .file_name()
            .map(|n| n.to_string_lossy().to_uppercase().contains("README"))
            .unwrap_or(false);
        if is_readme && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
