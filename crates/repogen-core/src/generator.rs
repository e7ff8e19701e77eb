//! Repository generation pipeline
//!
//! `Init → Scanned → (NoPackages | Built) → Aggregated → Checksummed → Done`

use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::archive::ArchiveBuilder;
use crate::checksum::write_checksum;
use crate::config::GeneratorConfig;
use crate::error::{RepoError, Result};
use crate::event::{emit, EventCallback, GenerateEvent};
use crate::index::write_index;
use crate::package::{PackageDescriptor, SkippedCandidate};
use crate::scanner::{DirectoryScanner, ScanResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Scanned,
    NoPackages,
    Built,
    Aggregated,
    Checksummed,
    Done,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Scanned => "scanned",
            Self::NoPackages => "no-packages",
            Self::Built => "built",
            Self::Aggregated => "aggregated",
            Self::Checksummed => "checksummed",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An addon whose archive could not be built
#[derive(Debug, Clone)]
pub struct ArchiveFailure {
    pub id: String,
    pub version: String,
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug)]
pub struct RunSummary {
    /// Every addon listed in the index, in scan order
    pub packages: Vec<PackageDescriptor>,
    pub skipped: Vec<SkippedCandidate>,
    pub archives: Vec<PathBuf>,
    pub failures: Vec<ArchiveFailure>,
    pub index_path: PathBuf,
    /// `None` when the checksum step could not run
    pub checksum: Option<String>,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing valid was found; no archive, index or checksum was written
    NoPackages { skipped: Vec<SkippedCandidate> },
    Completed(RunSummary),
}

pub struct RepositoryGenerator {
    config: GeneratorConfig,
}

impl RepositoryGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Discover addons without writing anything
    pub fn scan(&self, on_event: EventCallback<'_>) -> Result<ScanResult> {
        DirectoryScanner::new(&self.config).scan(on_event)
    }

    /// Full rebuild of archives, index and checksum.
    ///
    /// Per-addon failures are reported through `on_event` and collected in the
    /// summary. Only an uncreatable output directory, an unreadable source root
    /// or an unwritable index abort the run.
    pub fn run(&self, on_event: EventCallback<'_>) -> Result<RunOutcome> {
        emit(on_event, GenerateEvent::Stage(RunState::Init));
        // nothing is created under a root that does not exist
        if !self.config.root.is_dir() {
            return Err(RepoError::RootNotFound {
                path: self.config.root.clone(),
            });
        }
        self.ensure_output_dir(on_event)?;

        let ScanResult { packages, skipped } = self.scan(on_event)?;
        emit(on_event, GenerateEvent::Stage(RunState::Scanned));

        if packages.is_empty() {
            emit(on_event, GenerateEvent::Stage(RunState::NoPackages));
            return Ok(RunOutcome::NoPackages { skipped });
        }

        let builder = ArchiveBuilder::new(&self.config);
        let mut archives = Vec::new();
        let mut failures = Vec::new();
        for package in &packages {
            match builder.build(package, on_event) {
                Ok(built) => archives.push(built.path),
                Err(e) => {
                    emit(
                        on_event,
                        GenerateEvent::ArchiveFailed {
                            package,
                            error: &e,
                        },
                    );
                    failures.push(ArchiveFailure {
                        id: package.id.clone(),
                        version: package.version.clone(),
                        path: package.source_path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        emit(on_event, GenerateEvent::Stage(RunState::Built));

        // the index lists every scanned addon, whether or not its archive built
        let index_path = &self.config.index_path;
        let count = write_index(&packages, index_path)?;
        emit(
            on_event,
            GenerateEvent::IndexWritten {
                path: index_path,
                packages: count,
            },
        );
        emit(on_event, GenerateEvent::Stage(RunState::Aggregated));

        let checksum = match write_checksum(index_path, &self.config.checksum_path) {
            Ok(digest) => {
                emit(
                    on_event,
                    GenerateEvent::ChecksumWritten {
                        path: &self.config.checksum_path,
                        digest: &digest,
                    },
                );
                Some(digest)
            }
            Err(e) => {
                emit(on_event, GenerateEvent::ChecksumFailed { error: &e });
                None
            }
        };
        emit(on_event, GenerateEvent::Stage(RunState::Checksummed));

        emit(on_event, GenerateEvent::Stage(RunState::Done));
        Ok(RunOutcome::Completed(RunSummary {
            packages,
            skipped,
            archives,
            failures,
            index_path: index_path.clone(),
            checksum,
        }))
    }

    fn ensure_output_dir(&self, on_event: EventCallback<'_>) -> Result<()> {
        let dir = &self.config.output_dir;
        if dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|source| RepoError::OutputDirCreate {
            path: dir.clone(),
            source,
        })?;
        emit(on_event, GenerateEvent::OutputDirCreated { path: dir });
        Ok(())
    }
}
