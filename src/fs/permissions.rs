//! Permission normalization for curation artifacts
//!
//! Deposit folders and log files are shared between operator accounts, so
//! anything curator writes or moves is opened up to world read/write. The
//! current mode is compared first and `chmod` is only issued on a mismatch.
//!
//! Failures here never undo the operation that produced the artifact; the
//! `*_or_warn` variants log and carry on.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// Target mode for regular files.
pub const FILE_MODE: u32 = 0o666;

/// Target mode for directories (search bit included).
pub const DIR_MODE: u32 = 0o777;

/// Mode for retrieved data: read and execute only, for files and folders.
pub const READ_ONLY_MODE: u32 = 0o555;

const PERMISSION_BITS: u32 = 0o7777;

/// Set `path` to `mode` unless it already has exactly that mode.
///
/// Returns `Ok(true)` when a change was made, `Ok(false)` when the mode was
/// already correct. Symlinks are never followed.
#[cfg(unix)]
pub fn normalize(path: &Path, mode: u32) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        return Ok(false);
    }

    if meta.permissions().mode() & PERMISSION_BITS == mode {
        return Ok(false);
    }

    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "normalized permissions");
    Ok(true)
}

#[cfg(not(unix))]
pub fn normalize(path: &Path, _mode: u32) -> io::Result<bool> {
    fs::symlink_metadata(path).map(|_| false)
}

/// [`normalize`], downgrading failure to a warning.
pub fn normalize_or_warn(path: &Path, mode: u32) -> bool {
    match normalize(path, mode) {
        Ok(changed) => changed,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not normalize permissions");
            false
        }
    }
}

/// Counts from a recursive normalization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeReport {
    pub changed: usize,
    pub failed: usize,
}

/// Target modes for a recursive pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeModes {
    pub dir: u32,
    pub file: u32,
}

impl TreeModes {
    /// World read/write: [`DIR_MODE`] and [`FILE_MODE`].
    pub const SHARED: TreeModes = TreeModes {
        dir: DIR_MODE,
        file: FILE_MODE,
    };

    /// [`READ_ONLY_MODE`] throughout.
    pub const READ_ONLY: TreeModes = TreeModes {
        dir: READ_ONLY_MODE,
        file: READ_ONLY_MODE,
    };
}

/// Normalize `root` and everything below it: directories to [`DIR_MODE`],
/// files to [`FILE_MODE`]. Symlinks are skipped, not followed.
///
/// Never fails; problems are logged as warnings and counted.
pub fn normalize_tree(root: &Path) -> NormalizeReport {
    normalize_tree_with(root, TreeModes::SHARED)
}

/// [`normalize_tree`] with explicit target modes.
pub fn normalize_tree_with(root: &Path, modes: TreeModes) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    walk(root, modes, &mut report);
    if report.failed > 0 {
        warn!(
            path = %root.display(),
            failed = report.failed,
            "some entries kept their previous permissions"
        );
    }
    report
}

fn walk(path: &Path, modes: TreeModes, report: &mut NormalizeReport) {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not stat entry");
            report.failed += 1;
            return;
        }
    };

    if meta.file_type().is_symlink() {
        return;
    }

    let mode = if meta.is_dir() { modes.dir } else { modes.file };
    match normalize(path, mode) {
        Ok(true) => report.changed += 1,
        Ok(false) => {}
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not normalize permissions");
            report.failed += 1;
        }
    }

    if !meta.is_dir() {
        return;
    }

    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries.flatten() {
                walk(&entry.path(), modes, report);
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not list directory");
            report.failed += 1;
        }
    }
}
