//! Offline provider backed by a JSON file of depositor records.
//!
//! Useful for running the pipeline without network access and as the
//! provider double in tests. Each record may carry a `files` array; a file's
//! `download_url` is a local path or a `file://` URL.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;

use super::{DoiStatus, MetadataSource, ProviderError};
use crate::error::CurationError;
use crate::models::deposit::{
    CurationStatus, DepositFile, DepositId, DepositSummary, DepositorRecord,
};

#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    records: Vec<DepositorRecord>,
    files: HashMap<DepositId, Vec<DepositFile>>,
}

#[derive(Deserialize)]
struct RecordEntry {
    #[serde(flatten)]
    record: DepositorRecord,
    #[serde(default)]
    files: Vec<DepositFile>,
}

impl JsonFileSource {
    /// Load a JSON array of records. Duplicate deposit IDs are rejected.
    pub fn load(path: &Path) -> Result<Self, CurationError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CurationError::Configuration(format!(
                "failed to read records file {}: {e}",
                path.display()
            ))
        })?;
        let entries: Vec<RecordEntry> = serde_json::from_str(&content).map_err(|e| {
            CurationError::Configuration(format!(
                "invalid records file {}: {e}",
                path.display()
            ))
        })?;

        let mut files = HashMap::new();
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            if !entry.files.is_empty() {
                files.insert(entry.record.deposit_id.clone(), entry.files);
            }
            records.push(entry.record);
        }
        let mut source = Self::from_records(records)?;
        source.files = files;
        Ok(source)
    }

    /// Attach the file list of one deposit.
    pub fn with_files(mut self, id: DepositId, files: Vec<DepositFile>) -> Self {
        self.files.insert(id, files);
        self
    }

    pub fn from_records(records: Vec<DepositorRecord>) -> Result<Self, CurationError> {
        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(record.deposit_id.clone()) {
                return Err(CurationError::Configuration(format!(
                    "deposit {} appears more than once in the records file",
                    record.deposit_id
                )));
            }
        }
        Ok(Self {
            records,
            files: HashMap::new(),
        })
    }

    fn find(&self, id: &DepositId) -> Result<&DepositorRecord, ProviderError> {
        self.records
            .iter()
            .find(|r| &r.deposit_id == id)
            .ok_or_else(|| ProviderError::NotFound(format!("deposit {id}")))
    }
}

impl MetadataSource for JsonFileSource {
    fn fetch_depositor(&self, id: &DepositId) -> Result<DepositorRecord, ProviderError> {
        self.find(id).cloned()
    }

    fn list_pending(&self) -> Result<Vec<DepositSummary>, ProviderError> {
        let mut pending: Vec<DepositSummary> = self
            .records
            .iter()
            .filter(|r| r.status == CurationStatus::Pending)
            .map(DepositorRecord::summary)
            .collect();
        pending.sort_by_key(|s| s.created);
        Ok(pending)
    }

    fn doi_status(&self, id: &DepositId) -> Result<DoiStatus, ProviderError> {
        Ok(match &self.find(id)?.doi {
            Some(doi) if !doi.is_empty() => DoiStatus::Reserved(doi.clone()),
            _ => DoiStatus::NotReserved,
        })
    }

    fn reserve_doi(&self, id: &DepositId) -> Result<String, ProviderError> {
        match self.doi_status(id)? {
            DoiStatus::Reserved(doi) => Ok(doi),
            DoiStatus::NotReserved => Err(ProviderError::Unsupported(
                "the records file cannot mint DOIs".to_string(),
            )),
        }
    }

    fn list_files(&self, id: &DepositId) -> Result<Vec<DepositFile>, ProviderError> {
        self.find(id)?;
        Ok(self.files.get(id).cloned().unwrap_or_default())
    }

    fn download_file(&self, file: &DepositFile, out: &mut dyn Write) -> Result<u64, ProviderError> {
        let path = local_path(&file.download_url)?;
        let mut input = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ProviderError::NotFound(format!("file '{}' at {}", file.name, path.display()))
            }
            _ => ProviderError::Transient(format!("failed to open {}: {e}", path.display())),
        })?;
        io::copy(&mut input, out)
            .map_err(|e| ProviderError::Transient(format!("failed to copy {}: {e}", path.display())))
    }
}

fn local_path(location: &str) -> Result<PathBuf, ProviderError> {
    if location.starts_with("file:") {
        let url = Url::parse(location)
            .map_err(|e| ProviderError::Malformed(format!("bad file URL '{location}': {e}")))?;
        return url
            .to_file_path()
            .map_err(|_| ProviderError::Malformed(format!("not a local file URL: '{location}'")));
    }
    Ok(PathBuf::from(location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, name: &str, status: CurationStatus, day: u32) -> DepositorRecord {
        let created = Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap();
        DepositorRecord {
            deposit_id: DepositId::parse(id).unwrap(),
            depositor_name: name.to_string(),
            email: None,
            title: format!("Dataset {id}"),
            account_id: 1,
            created,
            modified: created,
            status,
            doi: None,
        }
    }

    #[test]
    fn test_fetch_known_and_unknown() {
        let source = JsonFileSource::from_records(vec![record(
            "1001",
            "Jane A. Doe",
            CurationStatus::Pending,
            1,
        )])
        .unwrap();

        let found = source
            .fetch_depositor(&DepositId::parse("1001").unwrap())
            .unwrap();
        assert_eq!(found.depositor_name, "Jane A. Doe");

        let missing = source.fetch_depositor(&DepositId::parse("9").unwrap());
        assert!(matches!(missing, Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_list_pending_filters_and_orders() {
        let source = JsonFileSource::from_records(vec![
            record("3", "C", CurationStatus::Pending, 20),
            record("1", "A", CurationStatus::Approved, 1),
            record("2", "B", CurationStatus::Pending, 5),
        ])
        .unwrap();

        let pending = source.list_pending().unwrap();
        let ids: Vec<&str> = pending.iter().map(|s| s.deposit_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_duplicate_records_rejected() {
        let result = JsonFileSource::from_records(vec![
            record("1", "A", CurationStatus::Pending, 1),
            record("1", "B", CurationStatus::Pending, 2),
        ]);
        assert!(result.unwrap_err().is_fatal());
    }

    #[test]
    fn test_reserve_doi_reports_existing() {
        let mut with_doi = record("1", "A", CurationStatus::Pending, 1);
        with_doi.doi = Some("10.1234/abc".to_string());
        let source = JsonFileSource::from_records(vec![
            with_doi,
            record("2", "B", CurationStatus::Pending, 1),
        ])
        .unwrap();

        let one = DepositId::parse("1").unwrap();
        let two = DepositId::parse("2").unwrap();
        assert_eq!(source.reserve_doi(&one).unwrap(), "10.1234/abc");
        assert_eq!(source.doi_status(&two).unwrap(), DoiStatus::NotReserved);
        assert!(matches!(
            source.reserve_doi(&two),
            Err(ProviderError::Unsupported(_))
        ));
    }

    fn attached(dir: &Path, name: &str, content: &str) -> DepositFile {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        DepositFile {
            id: 1,
            name: name.to_string(),
            size: content.len() as u64,
            download_url: path.display().to_string(),
            computed_md5: None,
            is_link_only: false,
        }
    }

    #[test]
    fn test_list_and_download_files() {
        let temp = tempfile::tempdir().unwrap();
        let id = DepositId::parse("1").unwrap();
        let file = attached(temp.path(), "cores.csv", "depth,mass\n");
        let source = JsonFileSource::from_records(vec![record("1", "A", CurationStatus::Pending, 1)])
            .unwrap()
            .with_files(id.clone(), vec![file.clone()]);

        assert_eq!(source.list_files(&id).unwrap(), vec![file.clone()]);

        let mut out: Vec<u8> = Vec::new();
        assert_eq!(source.download_file(&file, &mut out).unwrap(), 11);
        assert_eq!(out, b"depth,mass\n".to_vec());
    }

    #[test]
    fn test_list_files_of_unknown_deposit() {
        let source = JsonFileSource::default();
        let missing = source.list_files(&DepositId::parse("9").unwrap());
        assert!(matches!(missing, Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_download_missing_file_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let mut file = attached(temp.path(), "gone.csv", "");
        fs::remove_file(temp.path().join("gone.csv")).unwrap();
        file.download_url = format!("file://{}", temp.path().join("gone.csv").display());

        let result = JsonFileSource::default().download_file(&file, &mut Vec::<u8>::new());
        assert!(matches!(result, Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("records.json");
        fs::write(
            &path,
            r#"[{"deposit_id": 1001, "depositor_name": "Jane A. Doe", "title": "T",
                "account_id": 7, "created": "2024-01-01T00:00:00Z",
                "modified": "2024-01-01T00:00:00Z", "status": "pending"}]"#,
        )
        .unwrap();

        let source = JsonFileSource::load(&path).unwrap();
        assert_eq!(source.list_pending().unwrap().len(), 1);
    }

    #[test]
    fn test_load_records_with_files() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("records.json");
        fs::write(
            &path,
            r#"[{"deposit_id": "1001", "depositor_name": "Jane A. Doe", "title": "T",
                "account_id": 7, "created": "2024-01-01T00:00:00Z",
                "modified": "2024-01-01T00:00:00Z", "status": "pending",
                "files": [{"id": 5, "name": "a.csv", "size": 3,
                           "download_url": "/data/a.csv"}]}]"#,
        )
        .unwrap();

        let source = JsonFileSource::load(&path).unwrap();
        let files = source.list_files(&DepositId::parse("1001").unwrap()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].download_url, "/data/a.csv");
    }
}
