//! Stage directory layout
//!
//! Maps each configured stage to its base directory and defines the stage
//! ordering. Built once from configuration and validated before any deposit
//! is processed: a missing or unwritable base directory is fatal.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CurationConfig;
use crate::error::CurationError;
use crate::models::stage::Stage;

#[derive(Debug, Clone)]
pub struct StageLayout {
    stages: Vec<Stage>,
}

impl StageLayout {
    /// Build a layout from ordered `(name, base_dir)` pairs.
    ///
    /// The last pair is the terminal stage. Fails with a configuration
    /// error unless there are at least two uniquely named stages whose base
    /// directories are absolute, existing, writable directories.
    pub fn new(entries: Vec<(String, PathBuf)>) -> Result<Self, CurationError> {
        if entries.len() < 2 {
            return Err(CurationError::Configuration(format!(
                "at least two stages are required, got {}",
                entries.len()
            )));
        }

        let mut names = HashSet::new();
        let mut dirs = HashSet::new();
        let mut stages = Vec::with_capacity(entries.len());

        for (position, (name, base_dir)) in entries.into_iter().enumerate() {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CurationError::Configuration(format!(
                    "stage #{} has an empty name",
                    position + 1
                )));
            }
            if !names.insert(name.clone()) {
                return Err(CurationError::Configuration(format!(
                    "stage '{name}' is configured more than once"
                )));
            }
            if !dirs.insert(base_dir.clone()) {
                return Err(CurationError::Configuration(format!(
                    "stage '{name}' shares its directory {} with another stage",
                    base_dir.display()
                )));
            }
            check_base_dir(&name, &base_dir)?;
            stages.push(Stage::new(position, name, base_dir));
        }

        Ok(Self { stages })
    }

    pub fn from_config(config: &CurationConfig) -> Result<Self, CurationError> {
        Self::new(config.stage_dirs())
    }

    /// Stages in configured order, terminal last.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    pub fn first(&self) -> &Stage {
        &self.stages[0]
    }

    pub fn terminal(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    /// The last pre-publish stage, the only one `finalize` may leave.
    pub fn penultimate(&self) -> &Stage {
        &self.stages[self.stages.len() - 2]
    }

    pub fn base_dir<'a>(&self, stage: &'a Stage) -> &'a Path {
        stage.base_dir()
    }

    pub fn is_terminal(&self, stage: &Stage) -> bool {
        stage.position() + 1 == self.stages.len()
    }

    /// Stage after `stage` in the ordering. Undefined for the terminal stage.
    pub fn next_stage(&self, stage: &Stage) -> Result<&Stage, CurationError> {
        self.stages
            .get(stage.position() + 1)
            .ok_or_else(|| CurationError::InvalidTransition {
                stage: stage.name().to_string(),
                reason: "terminal stage has no next stage".to_string(),
            })
    }

    /// Stage before `stage` in the ordering. Undefined for the first stage.
    pub fn prev_stage(&self, stage: &Stage) -> Result<&Stage, CurationError> {
        stage
            .position()
            .checked_sub(1)
            .and_then(|p| self.stages.get(p))
            .ok_or_else(|| CurationError::InvalidTransition {
                stage: stage.name().to_string(),
                reason: "first stage has no previous stage".to_string(),
            })
    }
}

fn check_base_dir(name: &str, dir: &Path) -> Result<(), CurationError> {
    if !dir.is_absolute() {
        return Err(CurationError::Configuration(format!(
            "stage '{name}': base directory {} is not absolute",
            dir.display()
        )));
    }

    let meta = fs::metadata(dir).map_err(|e| {
        CurationError::Configuration(format!(
            "stage '{name}': base directory {} is not accessible: {e}",
            dir.display()
        ))
    })?;
    if !meta.is_dir() {
        return Err(CurationError::Configuration(format!(
            "stage '{name}': {} is not a directory",
            dir.display()
        )));
    }

    // Permission bits alone miss ACLs and read-only mounts; create a file.
    tempfile::Builder::new()
        .prefix(".curator-writable")
        .tempfile_in(dir)
        .map_err(|e| {
            CurationError::Configuration(format!(
                "stage '{name}': base directory {} is not writable: {e}",
                dir.display()
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn layout_in(root: &Path, names: &[&str]) -> StageLayout {
        let entries = names
            .iter()
            .map(|n| {
                let dir = root.join(n);
                fs::create_dir_all(&dir).unwrap();
                (n.to_string(), dir)
            })
            .collect();
        StageLayout::new(entries).unwrap()
    }

    #[test]
    fn test_ordering_and_terminal() {
        let temp = TempDir::new().unwrap();
        let layout = layout_in(temp.path(), &["intake", "review", "published"]);

        assert_eq!(layout.first().name(), "intake");
        assert_eq!(layout.penultimate().name(), "review");
        assert_eq!(layout.terminal().name(), "published");
        assert!(layout.is_terminal(layout.terminal()));
        assert!(!layout.is_terminal(layout.first()));

        let review = layout.stage("review").unwrap();
        assert_eq!(layout.next_stage(review).unwrap().name(), "published");
        assert_eq!(layout.prev_stage(review).unwrap().name(), "intake");
        assert_eq!(layout.base_dir(review), temp.path().join("review"));
    }

    #[test]
    fn test_no_wraparound() {
        let temp = TempDir::new().unwrap();
        let layout = layout_in(temp.path(), &["intake", "review", "published"]);

        let err = layout.next_stage(layout.terminal()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let err = layout.prev_stage(layout.first()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("intake")).unwrap();
        let result = StageLayout::new(vec![
            ("intake".to_string(), temp.path().join("intake")),
            ("published".to_string(), temp.path().join("missing")),
        ]);
        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("published"));
    }

    #[test]
    fn test_file_instead_of_directory_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("intake")).unwrap();
        fs::write(temp.path().join("published"), "not a dir").unwrap();
        let result = StageLayout::new(vec![
            ("intake".to_string(), temp.path().join("intake")),
            ("published".to_string(), temp.path().join("published")),
        ]);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_relative_directory_rejected() {
        let result = StageLayout::new(vec![
            ("intake".to_string(), PathBuf::from("relative/intake")),
            ("published".to_string(), PathBuf::from("relative/published")),
        ]);
        assert!(result.unwrap_err().to_string().contains("not absolute"));
    }

    #[test]
    fn test_single_stage_rejected() {
        let temp = TempDir::new().unwrap();
        let result = StageLayout::new(vec![("only".to_string(), temp.path().to_path_buf())]);
        assert!(result.unwrap_err().is_fatal());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        fs::create_dir(temp.path().join("b")).unwrap();
        let result = StageLayout::new(vec![
            ("intake".to_string(), temp.path().join("a")),
            ("intake".to_string(), temp.path().join("b")),
        ]);
        assert!(result.unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn test_shared_directory_rejected() {
        let temp = TempDir::new().unwrap();
        let result = StageLayout::new(vec![
            ("intake".to_string(), temp.path().to_path_buf()),
            ("published".to_string(), temp.path().to_path_buf()),
        ]);
        assert!(result.unwrap_err().is_fatal());
    }

    #[test]
    fn test_writability_check_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        layout_in(temp.path(), &["intake", "published"]);
        let leftovers = fs::read_dir(temp.path().join("intake")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
