//! Advisory-locked file access for deposit artifacts
//!
//! Two operators may run curator against the same deposit at once (see the
//! rename race in the transition engine). Manifest and agreement files are
//! therefore read and written under `fs2` advisory locks so a reader never
//! sees a half-written file.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Read file contents under a shared lock.
pub fn locked_read(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    file.lock_shared()
        .with_context(|| format!("Failed to acquire shared lock: {}", path.display()))?;
    let mut content = String::new();
    BufReader::new(&file)
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(content)
}

/// Replace file contents under an exclusive lock.
///
/// The sequence is: open → lock → truncate → write → flush. Truncating only
/// after the lock is held keeps concurrent readers from seeing an empty file.
pub fn locked_write(path: &Path, content: &str) -> Result<()> {
    let file = open_for_update(path)?;
    replace_contents(&file, path, content)
}

/// Read-modify-write under a single exclusive lock.
///
/// `update` receives the current contents (empty for a new file) and returns
/// the replacement, or `None` to leave the file untouched.
pub fn locked_update<F>(path: &Path, update: F) -> Result<bool>
where
    F: FnOnce(&str) -> Result<Option<String>>,
{
    let mut file = open_for_update(path)?;
    let mut current = String::new();
    file.read_to_string(&mut current)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    match update(&current)? {
        Some(next) => {
            replace_contents(&file, path, &next)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn open_for_update(path: &Path) -> Result<File> {
    #[allow(clippy::suspicious_open_options)]
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open file for writing: {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to acquire exclusive lock: {}", path.display()))?;
    Ok(file)
}

fn replace_contents(mut file: &File, path: &Path, content: &str) -> Result<()> {
    file.set_len(0)
        .with_context(|| format!("Failed to truncate file: {}", path.display()))?;
    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("Failed to rewind file: {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    file.flush()
        .with_context(|| format!("Failed to flush file: {}", path.display()))?;
    Ok(())
}
