mod common;

use std::fs;

use assert_matches::assert_matches;

use soakdb_sync::config::ConfigLoader;
use soakdb_sync::error::SyncError;

use common::utf8_tempdir;

#[test]
fn explicit_file_overrides_defaults() {
    let (_temp, root) = utf8_tempdir();
    let path = root.join("soakdb-sync.json");
    fs::write(
        path.as_std_path(),
        r#"{
  "schema_version": 1,
  "data_root": "/srv/xchem",
  "root_pattern": ["20*", "lb*"],
  "max_depth": 3,
  "exclusions": ["/scratch/"],
  "proposal_segment": 4,
  "central_db": "/var/lib/xchem.sqlite3",
  "bind": "0.0.0.0:9000"
}"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(Some(path.as_str())).unwrap();
    assert_eq!(resolved.data_root.as_str(), "/srv/xchem");
    assert_eq!(
        resolved
            .root_pattern
            .iter()
            .map(|level| level.as_str())
            .collect::<Vec<_>>(),
        vec!["20*", "lb*"]
    );
    assert_eq!(resolved.max_depth, 3);
    assert_eq!(resolved.exclusions, vec!["/scratch/".to_string()]);
    assert_eq!(resolved.proposal_segment, 4);
    assert_eq!(resolved.proposal_separator, '-');
    assert_eq!(resolved.target_filename, "soakDBDataFile.sqlite");
    assert_eq!(resolved.central_db.as_str(), "/var/lib/xchem.sqlite3");
    assert_eq!(resolved.bind.port(), 9000);
}

#[test]
fn missing_explicit_file_is_a_read_error() {
    let (_temp, root) = utf8_tempdir();
    let err = ConfigLoader::resolve(Some(root.join("nope.json").as_str())).unwrap_err();
    assert_matches!(err, SyncError::ConfigRead(_));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let (_temp, root) = utf8_tempdir();
    let path = root.join("bad.json");
    fs::write(path.as_std_path(), "{ not json").unwrap();
    let err = ConfigLoader::resolve(Some(path.as_str())).unwrap_err();
    assert_matches!(err, SyncError::ConfigParse(_));
}

#[test]
fn invalid_values_are_rejected() {
    let (_temp, root) = utf8_tempdir();
    for body in [
        r#"{"bind": "not-an-address"}"#,
        r#"{"target_filename": "nested/file.sqlite"}"#,
        r#"{"exclusions": [""]}"#,
        r#"{"root_pattern": [""]}"#,
        r#"{"schema_version": 2}"#,
        r#"{"schema_version": 0}"#,
    ] {
        let path = root.join("config.json");
        fs::write(path.as_std_path(), body).unwrap();
        let err = ConfigLoader::resolve(Some(path.as_str())).unwrap_err();
        assert_matches!(err, SyncError::InvalidConfig(_), "{body}");
    }
}
