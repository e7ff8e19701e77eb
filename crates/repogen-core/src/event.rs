use std::path::Path;

use crate::error::RepoError;
use crate::generator::RunState;
use crate::package::{PackageDescriptor, SkippedCandidate};

/// Progress reported while generating a repository
#[derive(Debug)]
pub enum GenerateEvent<'a> {
    Stage(RunState),
    OutputDirCreated {
        path: &'a Path,
    },
    PackageFound {
        package: &'a PackageDescriptor,
    },
    /// Warning: a candidate directory was dropped
    PackageSkipped {
        candidate: &'a SkippedCandidate,
    },
    ArchiveCreated {
        package: &'a PackageDescriptor,
        path: &'a Path,
        files: usize,
    },
    /// Error: the archive for this addon was not produced
    ArchiveFailed {
        package: &'a PackageDescriptor,
        error: &'a RepoError,
    },
    ArchiveHashWritten {
        path: &'a Path,
    },
    ManifestStaged {
        package: &'a PackageDescriptor,
        path: &'a Path,
    },
    StageFailed {
        package: &'a PackageDescriptor,
        error: &'a RepoError,
    },
    IndexWritten {
        path: &'a Path,
        packages: usize,
    },
    ChecksumWritten {
        path: &'a Path,
        digest: &'a str,
    },
    ChecksumFailed {
        error: &'a RepoError,
    },
}

/// Callback type for progress reporting
pub type EventCallback<'a> = Option<&'a dyn Fn(&GenerateEvent<'_>)>;

pub(crate) fn emit(on_event: EventCallback<'_>, event: GenerateEvent<'_>) {
    if let Some(f) = on_event {
        f(&event);
    }
}
