//! Curator configuration (`config.toml`)
//!
//! The file is parsed once at startup into a plain [`Config`] that is passed
//! by reference to every component. Example:
//!
//! ```toml
//! [curation]
//! root_directory = "/data/curation"
//! log_directory = "/data/curation/logs"
//!
//! [[curation.stages]]
//! name = "intake"
//! folder = "1.ToDo"
//!
//! [[curation.stages]]
//! name = "review"
//! folder = "2.UnderReview"
//!
//! [[curation.stages]]
//! name = "published"
//! folder = "/data/published"
//!
//! [provider]
//! kind = "figshare"
//! staging = false
//!
//! [survey]
//! base_url = "https://example.qualtrics.com/jfe/form/SV_abc"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::CurationError;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "CURATOR_CONFIG";

/// Environment variable that overrides `provider.api_token`.
pub const TOKEN_ENV: &str = "CURATOR_FIGSHARE_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub curation: CurationConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub survey: Option<SurveyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurationConfig {
    pub root_directory: PathBuf,
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_folder_data")]
    pub folder_data: String,
    #[serde(default = "default_folder_original_data")]
    pub folder_original_data: String,
    #[serde(default = "default_folder_metadata")]
    pub folder_metadata: String,
    /// Ordered stages; the last one is terminal.
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub name: String,
    /// Absolute, or relative to `root_directory`.
    pub folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Figshare(FigshareConfig),
    File(FileSourceConfig),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FigshareConfig {
    #[serde(default)]
    pub api_token: Option<String>,
    /// Use the staging API host instead of production.
    #[serde(default)]
    pub staging: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl FigshareConfig {
    /// Token from `CURATOR_FIGSHARE_TOKEN`, falling back to the file.
    pub fn token(&self) -> Option<String> {
        env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.api_token.clone().filter(|t| !t.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileSourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyConfig {
    pub base_url: String,
    /// Fixed query parameters appended to every generated link.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// Names of the sub-folders scaffolded inside every deposit folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositFolders {
    pub data: String,
    pub original_data: String,
    pub metadata: String,
}

fn default_folder_data() -> String {
    "DATA".to_string()
}

fn default_folder_original_data() -> String {
    "ORIGINAL_DATA".to_string()
}

fn default_folder_metadata() -> String {
    "METADATA".to_string()
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, CurationError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CurationError::Configuration(format!("invalid config: {e}")))?;
        config.curation.validate_folders()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CurationError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CurationError::Configuration(format!(
                "failed to read config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

impl CurationConfig {
    /// Stage names paired with their resolved base directories, in order.
    pub fn stage_dirs(&self) -> Vec<(String, PathBuf)> {
        self.stages
            .iter()
            .map(|s| (s.name.clone(), self.root_directory.join(&s.folder)))
            .collect()
    }

    pub fn deposit_folders(&self) -> DepositFolders {
        DepositFolders {
            data: self.folder_data.clone(),
            original_data: self.folder_original_data.clone(),
            metadata: self.folder_metadata.clone(),
        }
    }

    fn validate_folders(&self) -> Result<(), CurationError> {
        for (key, name) in [
            ("folder_data", &self.folder_data),
            ("folder_original_data", &self.folder_original_data),
            ("folder_metadata", &self.folder_metadata),
        ] {
            if !is_single_component(name) {
                return Err(CurationError::Configuration(format!(
                    "curation.{key} must be a single folder name, got '{name}'"
                )));
            }
        }
        Ok(())
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Pick the config file: explicit flag, then `$CURATOR_CONFIG`, then the
/// per-user config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, CurationError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("curator").join("config.toml"))
        .ok_or_else(|| {
            CurationError::Configuration(format!(
                "no config given: pass --config or set {CONFIG_ENV}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SAMPLE: &str = r#"
[curation]
root_directory = "/data/curation"

[[curation.stages]]
name = "intake"
folder = "1.ToDo"

[[curation.stages]]
name = "published"
folder = "/srv/published"

[provider]
kind = "figshare"
api_token = "file-token"
staging = true
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.curation.stages.len(), 2);
        assert_eq!(config.curation.folder_data, "DATA");
        assert_eq!(config.curation.folder_metadata, "METADATA");
        assert!(config.survey.is_none());
        match config.provider {
            ProviderConfig::Figshare(ref fs) => assert!(fs.staging),
            ProviderConfig::File(_) => panic!("expected figshare provider"),
        }
    }

    #[test]
    fn test_stage_dirs_resolve_relative_and_absolute() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let dirs = config.curation.stage_dirs();
        assert_eq!(dirs[0], ("intake".to_string(), PathBuf::from("/data/curation/1.ToDo")));
        assert_eq!(dirs[1], ("published".to_string(), PathBuf::from("/srv/published")));
    }

    #[test]
    fn test_file_provider_config() {
        let toml = SAMPLE.replace(
            "kind = \"figshare\"\napi_token = \"file-token\"\nstaging = true",
            "kind = \"file\"\npath = \"/tmp/records.json\"",
        );
        let config = Config::from_toml_str(&toml).unwrap();
        match config.provider {
            ProviderConfig::File(f) => assert_eq!(f.path, PathBuf::from("/tmp/records.json")),
            ProviderConfig::Figshare(_) => panic!("expected file provider"),
        }
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let toml = format!("{SAMPLE}\n[extras]\nfoo = 1\n");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_nested_subfolder_name_rejected() {
        let toml = SAMPLE.replace(
            "root_directory = \"/data/curation\"",
            "root_directory = \"/data/curation\"\nfolder_data = \"a/b\"",
        );
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("folder_data"));
    }

    #[test]
    #[serial]
    fn test_token_env_overrides_file() {
        let config = FigshareConfig {
            api_token: Some("file-token".to_string()),
            ..Default::default()
        };

        env::remove_var(TOKEN_ENV);
        assert_eq!(config.token().as_deref(), Some("file-token"));

        env::set_var(TOKEN_ENV, "env-token");
        assert_eq!(config.token().as_deref(), Some("env-token"));
        env::remove_var(TOKEN_ENV);
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_precedence() {
        env::set_var(CONFIG_ENV, "/etc/curator.toml");
        assert_eq!(
            resolve_config_path(Some(Path::new("/explicit.toml"))).unwrap(),
            PathBuf::from("/explicit.toml")
        );
        assert_eq!(
            resolve_config_path(None).unwrap(),
            PathBuf::from("/etc/curator.toml")
        );
        env::remove_var(CONFIG_ENV);
    }

    #[test]
    fn test_missing_config_file_is_configuration_error() {
        let err = Config::load(Path::new("/nonexistent/curator.toml")).unwrap_err();
        assert!(err.is_fatal());
    }
}
