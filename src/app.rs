use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use serde::Serialize;

use crate::central::CentralStore;
use crate::config::ResolvedConfig;
use crate::error::SyncError;
use crate::groups::GroupResolver;
use crate::locator::FileLocator;
use crate::registrar::{AccessRegistrar, RegistrarReport};
use crate::store::ArtifactStore;
use crate::transfer::{RecordTransfer, TransferReport};

#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    pub date: NaiveDate,
    pub list_path: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub date: NaiveDate,
    pub marker_path: String,
    pub located: Option<FindResult>,
    #[serde(flatten)]
    pub report: RegistrarReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub date: NaiveDate,
    pub marker_path: String,
    pub located: Option<FindResult>,
    #[serde(flatten)]
    pub report: TransferReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub find: FindResult,
    pub fedids: RegisterResult,
    pub transfer: TransferResult,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// The three batch steps over one configuration and artifact directory.
pub struct App<G: GroupResolver> {
    config: ResolvedConfig,
    artifacts: ArtifactStore,
    resolver: G,
}

impl<G: GroupResolver> App<G> {
    pub fn new(config: ResolvedConfig, resolver: G) -> Self {
        let artifacts = ArtifactStore::new(config.artifacts_dir.clone());
        Self {
            config,
            artifacts,
            resolver,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn find_files(
        &self,
        date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> Result<FindResult, SyncError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Find; scanning {}", self.config.data_root),
            elapsed: None,
        });

        let files = FileLocator::from_config(&self.config).locate()?;
        let list_path = self.artifacts.soakdb_list_path(date);
        ArtifactStore::write_path_list(&list_path, &files)?;

        sink.event(ProgressEvent {
            message: format!("phase=Find; found {} soakDB files", files.len()),
            elapsed: Some(started.elapsed()),
        });
        tracing::info!(count = files.len(), list = %list_path, "soakDB file list written");

        Ok(FindResult {
            date,
            list_path: list_path.to_string(),
            files: files.iter().map(ToString::to_string).collect(),
        })
    }

    pub fn register_access(
        &self,
        date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> Result<RegisterResult, SyncError> {
        let (files, located) = self.ensure_list(date, sink)?;
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=FedIDs; registering {} files", files.len()),
            elapsed: None,
        });

        let store = CentralStore::open(&self.config.central_db)?;
        let registrar = AccessRegistrar::new(
            &self.resolver,
            self.config.proposal_segment,
            self.config.proposal_separator,
        );
        let report = registrar.run(&files, &store)?;

        let marker_path = self.artifacts.fedids_marker_path(date);
        ArtifactStore::write_marker(&marker_path, &report.marker_text())?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=FedIDs; {} new files, {} proposals",
                report.files_inserted, report.proposals_resolved
            ),
            elapsed: Some(started.elapsed()),
        });

        Ok(RegisterResult {
            date,
            marker_path: marker_path.to_string(),
            located,
            report,
        })
    }

    pub fn transfer_records(
        &self,
        date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> Result<TransferResult, SyncError> {
        let (files, located) = self.ensure_list(date, sink)?;
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Transfer; reading {} files", files.len()),
            elapsed: None,
        });

        let mut store = CentralStore::open(&self.config.central_db)?;
        store.ensure_schema()?;
        let report = RecordTransfer::new(self.config.source_table.clone()).run(&files, &mut store)?;

        let marker_path = self.artifacts.transfer_marker_path(date);
        ArtifactStore::write_marker(&marker_path, &report.marker_text())?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Transfer; {} transferred, {} failed",
                report.files_transferred,
                report.failures.len()
            ),
            elapsed: Some(started.elapsed()),
        });

        Ok(TransferResult {
            date,
            marker_path: marker_path.to_string(),
            located,
            report,
        })
    }

    /// Find, then register, then transfer. The list is always rebuilt.
    pub fn run_all(&self, date: NaiveDate, sink: &dyn ProgressSink) -> Result<RunResult, SyncError> {
        let find = self.find_files(date, sink)?;
        let fedids = self.register_access(date, sink)?;
        let transfer = self.transfer_records(date, sink)?;
        Ok(RunResult {
            find,
            fedids,
            transfer,
        })
    }

    /// Reads the day's file list, running the locator first when it is absent.
    fn ensure_list(
        &self,
        date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> Result<(Vec<Utf8PathBuf>, Option<FindResult>), SyncError> {
        let list_path = self.artifacts.soakdb_list_path(date);
        if self.artifacts.exists(&list_path) {
            return Ok((ArtifactStore::read_path_list(&list_path)?, None));
        }
        tracing::info!(list = %list_path, "file list missing, locating first");
        let located = self.find_files(date, sink)?;
        let files = located.files.iter().map(Utf8PathBuf::from).collect();
        Ok((files, Some(located)))
    }
}
