use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::central::CentralStore;
use crate::domain::{ModificationDate, ProposalId, ProposalMembership, SoakdbFileEntry};
use crate::error::SyncError;
use crate::groups::GroupResolver;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrarReport {
    pub files_seen: usize,
    pub files_inserted: usize,
    pub files_skipped: usize,
    pub proposals_resolved: usize,
    pub memberships_inserted: usize,
}

impl RegistrarReport {
    pub fn marker_text(&self) -> String {
        format!(
            "TransferFedIDs DONE\nfiles_seen={} files_inserted={} files_skipped={}\nproposals_resolved={} memberships_inserted={}\n",
            self.files_seen,
            self.files_inserted,
            self.files_skipped,
            self.proposals_resolved,
            self.memberships_inserted
        )
    }
}

/// Registers soakDB files and the membership of the proposals they belong to.
pub struct AccessRegistrar<'a, G: GroupResolver> {
    resolver: &'a G,
    proposal_segment: usize,
    proposal_separator: char,
}

impl<'a, G: GroupResolver> AccessRegistrar<'a, G> {
    pub fn new(resolver: &'a G, proposal_segment: usize, proposal_separator: char) -> Self {
        Self {
            resolver,
            proposal_segment,
            proposal_separator,
        }
    }

    pub fn entry_for(&self, path: &Utf8Path) -> Result<SoakdbFileEntry, SyncError> {
        let proposal =
            ProposalId::from_path(path.as_str(), self.proposal_segment, self.proposal_separator)?;
        let modified = fs::metadata(path.as_std_path())
            .and_then(|meta| meta.modified())
            .map_err(|err| SyncError::Filesystem(format!("{path}: {err}")))?;
        Ok(SoakdbFileEntry {
            filename: path.to_string(),
            modification_date: ModificationDate::from_system_time(modified),
            proposal,
        })
    }

    /// Each insert commits on its own. Files whose proposal or mtime cannot be
    /// read are skipped; store errors abort the run.
    pub fn run(
        &self,
        paths: &[Utf8PathBuf],
        store: &CentralStore,
    ) -> Result<RegistrarReport, SyncError> {
        store.ensure_schema()?;
        let mut report = RegistrarReport {
            files_seen: paths.len(),
            ..RegistrarReport::default()
        };

        for path in paths {
            let entry = match self.entry_for(path) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "skipping soakDB file");
                    report.files_skipped += 1;
                    continue;
                }
            };
            if store.insert_soakdb_file(&entry)? {
                tracing::debug!(path = %path, proposal = %entry.proposal, "registered soakDB file");
                report.files_inserted += 1;
            }
        }

        for proposal in store.distinct_proposals()? {
            let members = match self.resolver.resolve_members(&proposal) {
                Ok(members) => members,
                Err(err) => {
                    tracing::warn!(proposal = %proposal, error = %err, "group lookup failed");
                    Vec::new()
                }
            };
            if members.is_empty() {
                tracing::warn!(proposal = %proposal, "proposal has no resolvable members");
            }
            report.proposals_resolved += 1;
            if store.insert_membership(&ProposalMembership::new(proposal, &members))? {
                report.memberships_inserted += 1;
            }
        }

        tracing::info!(
            inserted = report.files_inserted,
            skipped = report.files_skipped,
            proposals = report.proposals_resolved,
            "access registration finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::StaticGroups;

    #[test]
    fn marker_starts_with_done_line() {
        let text = RegistrarReport::default().marker_text();
        assert!(text.starts_with("TransferFedIDs DONE\n"));
    }

    #[test]
    fn short_path_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("soakDBDataFile.sqlite")).unwrap();
        fs::write(path.as_std_path(), b"").unwrap();

        let groups = StaticGroups::new();
        let registrar = AccessRegistrar::new(&groups, 40, '-');
        let store = CentralStore::open_in_memory().unwrap();
        let report = registrar.run(&[path], &store).unwrap();
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_inserted, 0);
    }
}
