use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Failed to parse manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("Manifest {path} is missing the '{attribute}' attribute")]
    ManifestMissingAttribute {
        path: PathBuf,
        attribute: &'static str,
    },

    #[error("Failed to build archive for {id} at {path}: {source}")]
    ArchiveBuild {
        id: String,
        path: PathBuf,
        #[source]
        source: Box<RepoError>,
    },

    #[error("{source}; partial archive left at {path}: {cleanup}")]
    PartialArchiveLeft {
        path: PathBuf,
        cleanup: String,
        #[source]
        source: Box<RepoError>,
    },

    #[error("Cannot create output directory {path}: {source}")]
    OutputDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write index {path}: {message}")]
    IndexWrite { path: PathBuf, message: String },

    #[error("Index file not found: {path} - cannot generate checksum")]
    ChecksumSourceMissing { path: PathBuf },

    #[error("Checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Source root does not exist: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Unknown config key: {key}")]
    ConfigKeyNotFound { key: String },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::OutputDirCreate { .. } => 2,
            Self::IndexWrite { .. } => 3,
            Self::ChecksumSourceMissing { .. } => 4,
            Self::ChecksumMismatch { .. } => 5,
            Self::RootNotFound { .. } => 6,
            Self::ConfigParse { .. } | Self::ConfigKeyNotFound { .. } => 7,
            _ => 1,
        }
    }
}
