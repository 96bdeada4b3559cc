use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Administrative grouping a soakDB file belongs to, e.g. `lb18145`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(String);

impl ProposalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Takes path segment `segment` (counting the empty segment before a
    /// leading `/`) and keeps the part before the first `separator`.
    pub fn from_path(path: &str, segment: usize, separator: char) -> Result<Self, SyncError> {
        let part = path
            .split('/')
            .nth(segment)
            .ok_or_else(|| SyncError::InvalidProposal(path.to_string()))?;
        let proposal = part.split(separator).next().unwrap_or_default();
        proposal
            .parse()
            .map_err(|_| SyncError::InvalidProposal(path.to_string()))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && !trimmed
                .chars()
                .any(|ch| ch.is_whitespace() || ch == '/' || ch == ':');
        if !is_valid {
            return Err(SyncError::InvalidProposal(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// File modification time as the integer `YYYYMMDDhhmmss` in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModificationDate(i64);

impl ModificationDate {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let local: DateTime<Local> = time.into();
        Self::from_naive(local.naive_local())
    }

    pub fn from_naive(value: NaiveDateTime) -> Self {
        let date = i64::from(value.year()) * 10_000 + i64::from(value.month()) * 100
            + i64::from(value.day());
        let time = i64::from(value.hour()) * 10_000
            + i64::from(value.minute()) * 100
            + i64::from(value.second());
        Self(date * 1_000_000 + time)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ModificationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoakdbFileEntry {
    pub filename: String,
    pub modification_date: ModificationDate,
    pub proposal: ProposalId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMembership {
    pub proposal: ProposalId,
    /// Comma-joined member identifiers, stored verbatim.
    pub fedids: String,
}

impl ProposalMembership {
    pub fn new(proposal: ProposalId, members: &[String]) -> Self {
        Self {
            proposal,
            fedids: members.join(","),
        }
    }
}
