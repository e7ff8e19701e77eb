use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::manifest::MANIFEST_FILE;

/// Which root an addon was discovered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Directly under the primary source root
    Fresh,
    /// Under the staged output root
    Staged,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Staged => "staged",
        }
    }

    /// Human-readable location used in run summaries
    pub fn location(&self) -> &'static str {
        match self {
            Self::Fresh => "root directory",
            Self::Staged => "output directory",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated addon found during scanning.
///
/// Only built once the manifest declared both `id` and `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub id: String,
    pub version: String,
    pub source_path: PathBuf,
    pub display_name: String,
    pub origin: Origin,
    /// Serialized manifest root element, captured at scan time
    #[serde(skip)]
    pub raw_manifest: String,
}

impl PackageDescriptor {
    /// `{id}-{version}.zip`
    pub fn archive_name(&self) -> String {
        format!("{}-{}.zip", self.id, self.version)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.source_path.join(MANIFEST_FILE)
    }

    /// Name of the directory the addon lives in
    pub fn dir_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.display_name.clone())
    }
}

/// A candidate directory that was dropped during scanning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCandidate {
    pub path: PathBuf,
    pub reason: String,
}
