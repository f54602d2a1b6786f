use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum UploaderError {
    #[error("invalid node guid: {0}")]
    InvalidNodeGuid(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("missing manifest file cryosim.json in current directory")]
    MissingConfig,

    #[error("failed to read manifest file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON manifest: {0}")]
    ConfigParse(String),

    #[error("no OSF token supplied (use --token or set OSF_TOKEN)")]
    MissingToken,

    #[error("OSF liveness check failed: {0}")]
    AuthenticationHttp(String),

    #[error("OSF rejected credentials with status {status}: {message}")]
    AuthenticationStatus { status: u16, message: String },

    #[error("OSF request failed: {0}")]
    OsfHttp(String),

    #[error("OSF returned status {status}: {message}")]
    OsfStatus { status: u16, message: String },

    #[error("simulation record has no output artifact for key: {0}")]
    MissingArtifact(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
