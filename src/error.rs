use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum OnboardError {
    #[error("invalid asset reference: {0}")]
    InvalidAssetReference(String),

    #[error("invalid dataset id: {0}")]
    InvalidDatasetId(String),

    #[error("invalid catalog environment: {0}")]
    InvalidEnvironment(String),

    #[error("missing manifest file neuro-onboard.json in current directory")]
    MissingManifest,

    #[error("failed to read manifest file at {0}")]
    ManifestRead(PathBuf),

    #[error("failed to parse JSON manifest: {0}")]
    ManifestParse(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("app already exists in compute resource: {0}")]
    DuplicateApp(String),

    #[error("app not found in compute resource: {0}")]
    AppNotFound(String),

    #[error("app {0} has both awsBatch and slurm options")]
    ConflictingBackends(String),

    #[error("invalid app configuration: {0}")]
    #[diagnostic(help("fix the listed fields; nothing was written"))]
    InvalidApp(String),
}
