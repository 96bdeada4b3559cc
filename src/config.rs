use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const CONFIG_FILE_NAME: &str = "soakdb-sync.json";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_root: Option<String>,
    #[serde(default)]
    pub root_pattern: Option<Vec<String>>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub target_filename: Option<String>,
    #[serde(default)]
    pub exclusions: Option<Vec<String>>,
    #[serde(default)]
    pub proposal_segment: Option<usize>,
    #[serde(default)]
    pub proposal_separator: Option<char>,
    #[serde(default)]
    pub source_table: Option<String>,
    #[serde(default)]
    pub central_db: Option<String>,
    #[serde(default)]
    pub artifacts_dir: Option<String>,
    #[serde(default)]
    pub bind: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub data_root: Utf8PathBuf,
    pub root_pattern: Vec<LevelPattern>,
    pub max_depth: usize,
    pub target_filename: String,
    pub exclusions: Vec<String>,
    pub proposal_segment: usize,
    pub proposal_separator: char,
    pub source_table: String,
    pub central_db: Utf8PathBuf,
    pub artifacts_dir: Utf8PathBuf,
    pub bind: SocketAddr,
}

/// A single-directory wildcard pattern such as `lb*`.
#[derive(Debug, Clone)]
pub struct LevelPattern {
    raw: String,
    regex: Regex,
}

impl LevelPattern {
    pub fn new(raw: &str) -> Result<Self, SyncError> {
        if raw.is_empty() || raw.contains('/') {
            return Err(SyncError::InvalidConfig(format!(
                "root pattern level must be a single non-empty name: {raw:?}"
            )));
        }
        let body = raw
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$"))
            .map_err(|err| SyncError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads an explicit config path, else `soakdb-sync.json` in the working
    /// directory, else the user config directory. Built-in defaults apply when
    /// no file is found and none was requested.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SyncError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("soakdb-sync").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SyncError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(SyncError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}, expected {SCHEMA_VERSION}"
            )));
        }

        let root_pattern = config
            .root_pattern
            .unwrap_or_else(default_root_pattern)
            .iter()
            .map(|level| LevelPattern::new(level))
            .collect::<Result<Vec<_>, SyncError>>()?;

        let target_filename = config
            .target_filename
            .unwrap_or_else(|| DEFAULT_TARGET_FILENAME.to_string());
        if target_filename.trim().is_empty() || target_filename.contains('/') {
            return Err(SyncError::InvalidConfig(format!(
                "target_filename must be a bare file name: {target_filename:?}"
            )));
        }

        let exclusions = config.exclusions.unwrap_or_else(default_exclusions);
        if exclusions.iter().any(|item| item.is_empty()) {
            return Err(SyncError::InvalidConfig(
                "exclusions must not contain empty strings".to_string(),
            ));
        }

        let source_table = config
            .source_table
            .unwrap_or_else(|| DEFAULT_SOURCE_TABLE.to_string());
        let table_ok = !source_table.is_empty()
            && source_table
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !table_ok {
            return Err(SyncError::InvalidConfig(format!(
                "source_table must be a plain identifier: {source_table:?}"
            )));
        }

        let bind = config
            .bind
            .as_deref()
            .unwrap_or(DEFAULT_BIND)
            .parse::<SocketAddr>()
            .map_err(|err| SyncError::InvalidConfig(format!("bind: {err}")))?;

        Ok(ResolvedConfig {
            schema_version,
            data_root: Utf8PathBuf::from(
                config
                    .data_root
                    .unwrap_or_else(|| DEFAULT_DATA_ROOT.to_string()),
            ),
            root_pattern,
            max_depth: config.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            target_filename,
            exclusions,
            proposal_segment: config.proposal_segment.unwrap_or(DEFAULT_PROPOSAL_SEGMENT),
            proposal_separator: config.proposal_separator.unwrap_or('-'),
            source_table,
            central_db: Utf8PathBuf::from(
                config
                    .central_db
                    .unwrap_or_else(|| DEFAULT_CENTRAL_DB.to_string()),
            ),
            artifacts_dir: Utf8PathBuf::from(
                config
                    .artifacts_dir
                    .unwrap_or_else(|| DEFAULT_ARTIFACTS_DIR.to_string()),
            ),
            bind,
        })
    }
}

const DEFAULT_DATA_ROOT: &str = "/dls/labxchem/data";
const DEFAULT_MAX_DEPTH: usize = 5;
const DEFAULT_TARGET_FILENAME: &str = "soakDBDataFile.sqlite";
const DEFAULT_PROPOSAL_SEGMENT: usize = 5;
const DEFAULT_SOURCE_TABLE: &str = "mainTable";
const DEFAULT_CENTRAL_DB: &str = "xchem.sqlite3";
const DEFAULT_ARTIFACTS_DIR: &str = ".soakdb-sync";
const DEFAULT_BIND: &str = "127.0.0.1:8080";

pub fn default_root_pattern() -> Vec<String> {
    vec!["*".to_string(), "lb*".to_string(), "*".to_string()]
}

pub fn default_exclusions() -> Vec<String> {
    vec![
        "/lab36/".to_string(),
        "/initial_model/".to_string(),
        "/beamline/".to_string(),
        "/analysis/".to_string(),
        "ackup".to_string(),
        "old".to_string(),
        "TeXRank".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_resolve() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.root_pattern.len(), 3);
        assert_eq!(resolved.max_depth, 5);
        assert_eq!(resolved.target_filename, "soakDBDataFile.sqlite");
        assert_eq!(resolved.exclusions, default_exclusions());
        assert_eq!(resolved.source_table, "mainTable");
    }

    #[test]
    fn level_pattern_wildcards() {
        let pattern = LevelPattern::new("lb*").unwrap();
        assert!(pattern.matches("lb18145-17"));
        assert!(!pattern.matches("cm12345-1"));
        let literal = LevelPattern::new("a.b").unwrap();
        assert!(literal.matches("a.b"));
        assert!(!literal.matches("axb"));
    }

    #[test]
    fn rejects_nested_pattern_level() {
        let config = Config {
            root_pattern: Some(vec!["a/b".to_string()]),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, SyncError::InvalidConfig(_));
    }

    #[test]
    fn rejects_unsafe_table_name() {
        let config = Config {
            source_table: Some("mainTable; DROP TABLE x".to_string()),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, SyncError::InvalidConfig(_));
    }
}
