mod common;

use std::sync::Mutex;

use soakdb_sync::central::CentralStore;
use soakdb_sync::domain::ProposalId;
use soakdb_sync::error::SyncError;
use soakdb_sync::groups::{GroupResolver, StaticGroups};
use soakdb_sync::registrar::AccessRegistrar;

use common::{create_soakdb, proposal_segment, utf8_tempdir, visit_file};

#[derive(Default)]
struct CountingGroups {
    calls: Mutex<Vec<String>>,
}

impl GroupResolver for CountingGroups {
    fn resolve_members(&self, proposal: &ProposalId) -> Result<Vec<String>, SyncError> {
        self.calls.lock().unwrap().push(proposal.to_string());
        Ok(vec!["abc12345".to_string(), "xyz98765".to_string()])
    }
}

#[test]
fn registers_files_and_memberships() {
    let (_temp, root) = utf8_tempdir();
    let first = visit_file(&root, "2017", "lb18145-17");
    let second = visit_file(&root, "2017", "lb18145-18");
    let third = visit_file(&root, "2018", "lb20001-1");
    for path in [&first, &second, &third] {
        create_soakdb(path, &["A"]);
    }

    let groups = CountingGroups::default();
    let registrar = AccessRegistrar::new(&groups, proposal_segment(&root), '-');
    let store = CentralStore::open_in_memory().unwrap();
    let report = registrar
        .run(&[first.clone(), second, third], &store)
        .unwrap();

    assert_eq!(report.files_seen, 3);
    assert_eq!(report.files_inserted, 3);
    assert_eq!(report.proposals_resolved, 2);
    assert_eq!(report.memberships_inserted, 2);
    assert_eq!(
        *groups.calls.lock().unwrap(),
        vec!["lb18145".to_string(), "lb20001".to_string()]
    );

    let files = store.soakdb_files().unwrap();
    assert_eq!(files[0].filename, first.to_string());
    assert_eq!(files[0].proposal.as_str(), "lb18145");
    assert!(files[0].modification_date.value() > 19_700_101_000_000);

    let memberships = store.proposals().unwrap();
    assert_eq!(memberships[0].fedids, "abc12345,xyz98765");
}

#[test]
fn rerun_on_unchanged_files_inserts_nothing() {
    let (_temp, root) = utf8_tempdir();
    let path = visit_file(&root, "2017", "lb18145-17");
    create_soakdb(&path, &["A"]);

    let groups = StaticGroups::new().with_group("lb18145", &["abc12345"]);
    let registrar = AccessRegistrar::new(&groups, proposal_segment(&root), '-');
    let store = CentralStore::open_in_memory().unwrap();

    let first = registrar.run(&[path.clone()], &store).unwrap();
    let second = registrar.run(&[path], &store).unwrap();
    assert_eq!(first.files_inserted, 1);
    assert_eq!(second.files_inserted, 0);
    assert_eq!(second.memberships_inserted, 0);
    assert_eq!(store.soakdb_files().unwrap().len(), 1);
    assert_eq!(store.proposals().unwrap().len(), 1);
}

#[test]
fn unknown_group_is_stored_with_no_members() {
    let (_temp, root) = utf8_tempdir();
    let path = visit_file(&root, "2017", "lb99999-1");
    create_soakdb(&path, &["A"]);

    let groups = StaticGroups::new();
    let registrar = AccessRegistrar::new(&groups, proposal_segment(&root), '-');
    let store = CentralStore::open_in_memory().unwrap();
    let report = registrar.run(&[path], &store).unwrap();

    assert_eq!(report.memberships_inserted, 1);
    let memberships = store.proposals().unwrap();
    assert_eq!(memberships[0].proposal.as_str(), "lb99999");
    assert_eq!(memberships[0].fedids, "");
}

struct FailingGroups;

impl GroupResolver for FailingGroups {
    fn resolve_members(&self, _proposal: &ProposalId) -> Result<Vec<String>, SyncError> {
        Err(SyncError::GroupLookup("directory service unreachable".to_string()))
    }
}

#[test]
fn failed_group_lookup_is_stored_with_no_members() {
    let (_temp, root) = utf8_tempdir();
    let path = visit_file(&root, "2017", "lb18145-17");
    create_soakdb(&path, &["A"]);

    let registrar = AccessRegistrar::new(&FailingGroups, proposal_segment(&root), '-');
    let store = CentralStore::open_in_memory().unwrap();
    let report = registrar.run(&[path], &store).unwrap();

    assert_eq!(report.files_inserted, 1);
    assert_eq!(report.proposals_resolved, 1);
    assert_eq!(report.memberships_inserted, 1);
    let memberships = store.proposals().unwrap();
    assert_eq!(memberships[0].proposal.as_str(), "lb18145");
    assert_eq!(memberships[0].fedids, "");
}

#[test]
fn vanished_file_is_skipped() {
    let (_temp, root) = utf8_tempdir();
    let present = visit_file(&root, "2017", "lb18145-17");
    create_soakdb(&present, &["A"]);
    let vanished = visit_file(&root, "2017", "lb18145-99");

    let groups = StaticGroups::new();
    let registrar = AccessRegistrar::new(&groups, proposal_segment(&root), '-');
    let store = CentralStore::open_in_memory().unwrap();
    let report = registrar.run(&[vanished, present], &store).unwrap();

    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.files_inserted, 1);
}
