mod common;

use std::fs;

use soakdb_sync::config::{Config, ConfigLoader, default_exclusions};
use soakdb_sync::locator::FileLocator;

use common::{TARGET, utf8_tempdir};

fn touch(path: &camino::Utf8Path) {
    fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
    fs::write(path.as_std_path(), b"").unwrap();
}

fn locator(root: &camino::Utf8Path) -> FileLocator {
    let config = Config {
        data_root: Some(root.to_string()),
        ..Config::default()
    };
    FileLocator::from_config(&ConfigLoader::resolve_config(config).unwrap())
}

#[test]
fn results_end_with_target_and_avoid_exclusions() {
    let (_temp, root) = utf8_tempdir();
    let candidates = [
        "2017/lb18145-17/processing/database",
        "2017/lb18145-17/processing/lab36/database",
        "2017/lb18145-17/processing/initial_model/x",
        "2017/lb18145-17/processing/beamline/x",
        "2017/lb18145-17/processing/analysis/x",
        "2017/lb18145-17/processing/Backup/x",
        "2017/lb18145-17/processing/old/x",
        "2017/lb18145-17/processing/TeXRank/x",
        "2018/lb20001-1/processing/database",
        "2018/lb20001-1",
        "2018/sw20001-1/processing/database",
    ];
    for dir in candidates {
        touch(&root.join(dir).join(TARGET));
    }
    touch(&root.join("2017/lb18145-17/processing/database/notes.txt"));

    let found = locator(&root).locate().unwrap();
    let exclusions = default_exclusions();
    assert_eq!(found.len(), 3);
    for path in &found {
        assert_eq!(path.file_name(), Some(TARGET));
        let relative = format!("/{}", path.strip_prefix(&root.canonicalize_utf8().unwrap()).unwrap());
        assert!(
            exclusions.iter().all(|needle| !relative.contains(needle.as_str())),
            "{relative}"
        );
    }
    let mut sorted = found.clone();
    sorted.sort();
    assert_eq!(found, sorted);
}

#[test]
fn excluded_word_in_data_root_itself_is_ignored() {
    let (_temp, workspace) = utf8_tempdir();
    let root = workspace.join("old_archive");
    touch(&root.join("2017/lb1-1/processing").join(TARGET));

    let found = locator(&root).locate().unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn files_above_the_pattern_depth_are_ignored() {
    let (_temp, root) = utf8_tempdir();
    touch(&root.join(TARGET));
    touch(&root.join("2017").join(TARGET));

    assert!(locator(&root).locate().unwrap().is_empty());
}

#[test]
fn exclusion_matches_relative_substrings() {
    let (_temp, root) = utf8_tempdir();
    let locator = locator(&root);
    assert!(locator.is_excluded("/2017/lb1/processing/backup/"));
    assert!(locator.is_excluded("/2017/lb1/processing/golden/"));
    assert!(!locator.is_excluded("/2017/lb1/processing/database/"));
}
