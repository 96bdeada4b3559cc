#![allow(dead_code)]

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, params};
use tempfile::TempDir;

use soakdb_sync::columns::expected_source_columns;
use soakdb_sync::config::{Config, ConfigLoader, ResolvedConfig};

pub const TARGET: &str = "soakDBDataFile.sqlite";

pub fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

/// Writes a soakDB file with one `mainTable` row per crystal name.
pub fn create_soakdb(path: &Utf8Path, crystals: &[&str]) {
    create_soakdb_with_columns(path, &expected_source_columns(), crystals);
}

pub fn create_soakdb_with_columns(path: &Utf8Path, columns: &[&str], crystals: &[&str]) {
    fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
    let conn = Connection::open(path.as_std_path()).unwrap();
    let declared = columns
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!(
        "CREATE TABLE mainTable (ID INTEGER PRIMARY KEY, {declared});"
    ))
    .unwrap();
    for crystal in crystals {
        conn.execute(
            "INSERT INTO mainTable (CrystalName) VALUES (?1)",
            params![crystal],
        )
        .unwrap();
    }
    if columns.contains(&"DataCollectionWavelength") {
        conn.execute(
            "UPDATE mainTable SET DataCollectionWavelength = 0.9126, \
             RefinementOutcome = '3 - In Refinement', LabVisit = 'lb18145-17'",
            [],
        )
        .unwrap();
    }
}

pub fn write_corrupt(path: &Utf8Path) {
    fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
    fs::write(path.as_std_path(), b"this is not a sqlite database, only text").unwrap();
}

/// `<root>/<year>/<visit>/processing/database/soakDBDataFile.sqlite`
pub fn visit_file(root: &Utf8Path, year: &str, visit: &str) -> Utf8PathBuf {
    root.join(year)
        .join(visit)
        .join("processing")
        .join("database")
        .join(TARGET)
}

/// Path segment index of the visit directory below `root`.
pub fn proposal_segment(root: &Utf8Path) -> usize {
    root.as_str().split('/').count() + 1
}

/// Config for a workspace; the data root must already exist.
pub fn config_for(workspace: &Utf8Path, data_root: &Utf8Path) -> ResolvedConfig {
    let located_root = data_root
        .canonicalize_utf8()
        .unwrap_or_else(|_| data_root.to_path_buf());
    let config = Config {
        data_root: Some(data_root.to_string()),
        proposal_segment: Some(proposal_segment(&located_root)),
        central_db: Some(workspace.join("xchem.sqlite3").to_string()),
        artifacts_dir: Some(workspace.join("artifacts").to_string()),
        ..Config::default()
    };
    ConfigLoader::resolve_config(config).unwrap()
}
