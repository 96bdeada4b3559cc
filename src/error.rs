use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("cannot derive proposal from path: {0}")]
    InvalidProposal(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("central store error: {0}")]
    CentralStore(String),

    #[error("failed to open soakDB file {path}: {message}")]
    SourceOpen { path: String, message: String },

    #[error("failed to query soakDB file {path}: {message}")]
    SourceQuery { path: String, message: String },

    #[error("soakDB file {path} is missing columns: {}", missing.join(", "))]
    #[diagnostic(help("the source table no longer matches the expected column list"))]
    SchemaMismatch { path: String, missing: Vec<String> },

    #[error("group lookup failed: {0}")]
    GroupLookup(String),

    #[error("server error: {0}")]
    Server(String),
}
