use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::ProposalId;
use crate::error::SyncError;

/// Looks up the members of the group named after a proposal.
pub trait GroupResolver: Send + Sync {
    /// An unknown group and a group without members both resolve to an empty
    /// list.
    fn resolve_members(&self, proposal: &ProposalId) -> Result<Vec<String>, SyncError>;
}

/// Resolves groups through the system group database (`getent group`).
#[derive(Debug, Clone)]
pub struct SystemGroupResolver {
    getent: Option<PathBuf>,
}

impl SystemGroupResolver {
    pub fn new() -> Self {
        Self {
            getent: find_in_path("getent"),
        }
    }

    fn run_getent(&self, program: &Path, proposal: &ProposalId) -> Result<Vec<String>, SyncError> {
        let output = match Command::new(program)
            .arg("group")
            .arg(proposal.as_str())
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(
                    proposal = %proposal,
                    program = %program.display(),
                    error = %err,
                    "could not run group lookup"
                );
                return Ok(Vec::new());
            }
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                proposal = %proposal,
                code = ?output.status.code(),
                stderr = %stderr,
                "group lookup returned nothing"
            );
            return Ok(Vec::new());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .next()
            .map(parse_group_entry)
            .unwrap_or_default())
    }
}

impl Default for SystemGroupResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupResolver for SystemGroupResolver {
    fn resolve_members(&self, proposal: &ProposalId) -> Result<Vec<String>, SyncError> {
        let Some(getent) = self.getent.as_ref() else {
            tracing::warn!(proposal = %proposal, "getent not found in PATH");
            return Ok(Vec::new());
        };
        self.run_getent(getent, proposal)
    }
}

/// Members from a `name:password:gid:member,member` line.
pub fn parse_group_entry(line: &str) -> Vec<String> {
    line.trim()
        .split(':')
        .nth(3)
        .map(|members| {
            members
                .split(',')
                .map(str::trim)
                .filter(|member| !member.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Fixed proposal → members table.
#[derive(Debug, Clone, Default)]
pub struct StaticGroups {
    groups: HashMap<String, Vec<String>>,
}

impl StaticGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, proposal: &str, members: &[&str]) -> Self {
        self.groups.insert(
            proposal.to_string(),
            members.iter().map(|member| member.to_string()).collect(),
        );
        self
    }
}

impl GroupResolver for StaticGroups {
    fn resolve_members(&self, proposal: &ProposalId) -> Result<Vec<String>, SyncError> {
        Ok(self
            .groups
            .get(proposal.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
