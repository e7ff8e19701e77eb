pub mod archive;
pub mod checksum;
pub mod config;
pub mod error;
pub mod event;
pub mod generator;
pub mod index;
pub mod manifest;
pub mod package;
pub mod scanner;
pub mod walk;

pub use archive::{archive_path_for, ArchiveBuilder, BuiltArchive};
pub use checksum::{compute_md5, verify_checksum, write_checksum};
pub use config::{Config, GeneratorConfig};
pub use error::{RepoError, Result};
pub use event::{EventCallback, GenerateEvent};
pub use generator::{ArchiveFailure, RepositoryGenerator, RunOutcome, RunState, RunSummary};
pub use index::{render_index, write_index};
pub use manifest::{Manifest, MANIFEST_FILE};
pub use package::{Origin, PackageDescriptor, SkippedCandidate};
pub use scanner::{DirectoryScanner, ScanResult};
pub use walk::{package_files, ExclusionRules};
