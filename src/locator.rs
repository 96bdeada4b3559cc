use camino::{Utf8Path, Utf8PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::{LevelPattern, ResolvedConfig};
use crate::error::SyncError;

/// Finds soakDB files below the data root, pruning excluded directories.
#[derive(Debug, Clone)]
pub struct FileLocator {
    data_root: Utf8PathBuf,
    root_pattern: Vec<LevelPattern>,
    max_depth: usize,
    target_filename: String,
    exclusions: Vec<String>,
}

impl FileLocator {
    pub fn new(
        data_root: Utf8PathBuf,
        root_pattern: Vec<LevelPattern>,
        max_depth: usize,
        target_filename: String,
        exclusions: Vec<String>,
    ) -> Self {
        Self {
            data_root,
            root_pattern,
            max_depth,
            target_filename,
            exclusions,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            config.data_root.clone(),
            config.root_pattern.clone(),
            config.max_depth,
            config.target_filename.clone(),
            config.exclusions.clone(),
        )
    }

    /// Sorted absolute paths of every matching file. A missing or unreadable
    /// root is not an error; it yields an empty list.
    pub fn locate(&self) -> Result<Vec<Utf8PathBuf>, SyncError> {
        if !self.data_root.as_std_path().is_dir() {
            tracing::warn!(root = %self.data_root, "data root is not a directory");
            return Ok(Vec::new());
        }
        let root = self
            .data_root
            .canonicalize_utf8()
            .map_err(|err| SyncError::InvalidPath(format!("{}: {err}", self.data_root)))?;

        let pattern_depth = self.root_pattern.len();
        let walker = WalkDir::new(root.as_std_path())
            .follow_links(false)
            .min_depth(1)
            .max_depth(pattern_depth + self.max_depth)
            .into_iter()
            .filter_entry(|entry| self.should_descend(&root, entry));

        let mut found = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || entry.depth() < pattern_depth {
                continue;
            }
            if entry.file_name().to_str() != Some(self.target_filename.as_str()) {
                continue;
            }
            match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) => found.push(path),
                Err(path) => tracing::warn!(path = %path.display(), "skipping non-UTF-8 path"),
            }
        }

        found.sort();
        let pattern = self
            .root_pattern
            .iter()
            .map(LevelPattern::as_str)
            .collect::<Vec<_>>()
            .join("/");
        tracing::debug!(count = found.len(), pattern = %pattern, "located soakDB files");
        Ok(found)
    }

    fn should_descend(&self, root: &Utf8Path, entry: &DirEntry) -> bool {
        let depth = entry.depth();
        if depth >= 1 && depth <= self.root_pattern.len() {
            let name = entry.file_name().to_string_lossy();
            if !self.root_pattern[depth - 1].matches(&name) {
                return false;
            }
        }

        let Ok(relative) = entry.path().strip_prefix(root.as_std_path()) else {
            return false;
        };
        let relative = relative.to_string_lossy();
        let candidate = if entry.file_type().is_dir() {
            format!("/{relative}/")
        } else {
            format!("/{relative}")
        };
        !self.is_excluded(&candidate)
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclusions
            .iter()
            .any(|needle| path.contains(needle.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::{Config, ConfigLoader};

    fn touch(root: &Utf8Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
        fs::write(path.as_std_path(), b"").unwrap();
    }

    fn locator_for(root: &Utf8Path) -> FileLocator {
        let config = Config {
            data_root: Some(root.to_string()),
            ..Config::default()
        };
        FileLocator::from_config(&ConfigLoader::resolve_config(config).unwrap())
    }

    #[test]
    fn finds_target_files_and_prunes_exclusions() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        touch(&root, "2017/lb18145-17/processing/database/soakDBDataFile.sqlite");
        touch(&root, "2017/lb18145-17/processing/database/other.sqlite");
        touch(&root, "2017/lb18145-17/processing/analysis/database/soakDBDataFile.sqlite");
        touch(&root, "2017/lb18145-17/processing/backup/soakDBDataFile.sqlite");
        touch(&root, "2017/lb18145-17/processing/old_runs/soakDBDataFile.sqlite");
        touch(&root, "2017/cm12345-1/processing/database/soakDBDataFile.sqlite");

        let found = locator_for(&root).locate().unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("lb18145-17/processing/database/soakDBDataFile.sqlite"));
    }

    #[test]
    fn respects_max_depth_below_pattern() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        touch(&root, "2019/lb1-1/processing/a/b/c/d/soakDBDataFile.sqlite");
        touch(&root, "2019/lb1-1/processing/a/b/c/d/e/soakDBDataFile.sqlite");

        let found = locator_for(&root).locate().unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("d/soakDBDataFile.sqlite"));
    }

    #[test]
    fn missing_root_is_empty() {
        let found = locator_for(Utf8Path::new("/definitely/not/here"))
            .locate()
            .unwrap();
        assert!(found.is_empty());
    }
}
