use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;

use crate::error::SyncError;

/// Dated step artifacts: the soakDB path list and per-step completion markers.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
}

impl ArtifactStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn soakdb_list_path(&self, date: NaiveDate) -> Utf8PathBuf {
        self.root
            .join("soakDBfiles")
            .join(date.format("soakDB_%Y%m%d.txt").to_string())
    }

    pub fn fedids_marker_path(&self, date: NaiveDate) -> Utf8PathBuf {
        self.root
            .join("transfer_logs")
            .join(date.format("fedids_%Y%m%d.txt").to_string())
    }

    pub fn transfer_marker_path(&self, date: NaiveDate) -> Utf8PathBuf {
        self.root
            .join("transfer_logs")
            .join(date.format("transfer_experiment_%Y%m%d.txt").to_string())
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    pub fn write_path_list(path: &Utf8Path, paths: &[Utf8PathBuf]) -> Result<(), SyncError> {
        let mut content = String::new();
        for item in paths {
            content.push_str(item.as_str());
            content.push('\n');
        }
        Self::write_bytes_atomic(path, content.as_bytes())
    }

    pub fn read_path_list(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SyncError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| SyncError::Artifact(format!("read {path}: {err}")))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Utf8PathBuf::from)
            .collect())
    }

    pub fn write_marker(path: &Utf8Path, text: &str) -> Result<(), SyncError> {
        Self::write_bytes_atomic(path, text.as_bytes())
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SyncError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_layout() {
        let store = ArtifactStore::new(Utf8PathBuf::from("/work"));
        let date = NaiveDate::from_ymd_opt(2018, 1, 9).unwrap();
        assert_eq!(
            store.soakdb_list_path(date),
            Utf8PathBuf::from("/work/soakDBfiles/soakDB_20180109.txt")
        );
        assert!(store.fedids_marker_path(date).ends_with("transfer_logs/fedids_20180109.txt"));
        assert!(
            store
                .transfer_marker_path(date)
                .ends_with("transfer_logs/transfer_experiment_20180109.txt")
        );
    }
}
