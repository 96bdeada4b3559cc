mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::NaiveDate;

use soakdb_sync::error::SyncError;
use soakdb_sync::store::ArtifactStore;

use common::utf8_tempdir;

#[test]
fn path_list_round_trips_and_overwrites() {
    let (_temp, root) = utf8_tempdir();
    let store = ArtifactStore::new(root.clone());
    let date = NaiveDate::from_ymd_opt(2018, 1, 9).unwrap();
    let path = store.soakdb_list_path(date);

    let first = vec![Utf8PathBuf::from("/a/soakDBDataFile.sqlite")];
    ArtifactStore::write_path_list(&path, &first).unwrap();
    let second = vec![
        Utf8PathBuf::from("/b/soakDBDataFile.sqlite"),
        Utf8PathBuf::from("/c/soakDBDataFile.sqlite"),
    ];
    ArtifactStore::write_path_list(&path, &second).unwrap();

    assert_eq!(ArtifactStore::read_path_list(&path).unwrap(), second);
    assert!(!path.with_extension("tmp").as_std_path().exists());
}

#[test]
fn blank_lines_are_skipped() {
    let (_temp, root) = utf8_tempdir();
    let path = root.join("list.txt");
    std::fs::write(path.as_std_path(), "\n/a/x.sqlite\n  \n /b/y.sqlite \n").unwrap();
    assert_eq!(
        ArtifactStore::read_path_list(&path).unwrap(),
        vec![Utf8PathBuf::from("/a/x.sqlite"), Utf8PathBuf::from("/b/y.sqlite")]
    );
}

#[test]
fn missing_list_is_an_artifact_error() {
    let (_temp, root) = utf8_tempdir();
    let err = ArtifactStore::read_path_list(&root.join("absent.txt")).unwrap_err();
    assert_matches!(err, SyncError::Artifact(_));
}

#[test]
fn marker_is_written_under_transfer_logs() {
    let (_temp, root) = utf8_tempdir();
    let store = ArtifactStore::new(root.clone());
    let date = NaiveDate::from_ymd_opt(2018, 1, 9).unwrap();
    let path = store.fedids_marker_path(date);
    ArtifactStore::write_marker(&path, "TransferFedIDs DONE\n").unwrap();
    assert!(store.exists(&path));
    assert!(path.starts_with(root.join("transfer_logs")));
}
