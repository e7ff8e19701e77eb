use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::checksum::{archive_hash_path, write_archive_hash};
use crate::config::GeneratorConfig;
use crate::error::{RepoError, Result};
use crate::event::{emit, EventCallback, GenerateEvent};
use crate::manifest::MANIFEST_FILE;
use crate::package::{Origin, PackageDescriptor};
use crate::walk::{package_files, ExclusionRules};

/// Path of a file inside an addon archive.
///
/// * `Fresh` addons keep their path relative to the primary source root,
///   which for an immediate child of that root starts with the package
///   directory name.
/// * `Staged` addons always get `display_name` as the top-level component,
///   whatever nesting sat above the package directory.
///
/// `relative` is relative to the package directory. Separators are always `/`.
pub fn archive_path_for(
    origin: Origin,
    relative: &Path,
    package_dir_name: &str,
    display_name: &str,
) -> String {
    let top = match origin {
        Origin::Fresh => package_dir_name,
        Origin::Staged => display_name,
    };

    let mut parts = vec![top.to_string()];
    parts.extend(
        relative
            .components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
    );
    parts.join("/")
}

/// Outcome of a successful archive build
#[derive(Debug)]
pub struct BuiltArchive {
    pub path: PathBuf,
    pub files: usize,
}

pub struct ArchiveBuilder<'a> {
    output_dir: &'a Path,
    rules: &'a ExclusionRules,
    archive_hashes: bool,
}

impl<'a> ArchiveBuilder<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            output_dir: &config.output_dir,
            rules: &config.rules,
            archive_hashes: config.archive_hashes,
        }
    }

    pub fn archive_path(&self, package: &PackageDescriptor) -> PathBuf {
        self.output_dir.join(package.archive_name())
    }

    /// Build the archive for one addon.
    ///
    /// Any existing archive is removed first. On failure nothing is left at the
    /// target path; if that removal fails too the error is `PartialArchiveLeft`. Staging the manifest of a fresh addon happens afterwards and
    /// is reported separately; it never invalidates a finished archive.
    pub fn build(
        &self,
        package: &PackageDescriptor,
        on_event: EventCallback<'_>,
    ) -> Result<BuiltArchive> {
        let target = self.archive_path(package);
        let wrap = |source: RepoError| RepoError::ArchiveBuild {
            id: package.id.clone(),
            path: target.clone(),
            source: Box::new(source),
        };

        self.remove_existing(&target).map_err(wrap)?;

        let files = match self.write_archive(package, &target) {
            Ok(files) => files,
            Err(e) => return Err(wrap(self.discard(&target, e))),
        };

        emit(
            on_event,
            GenerateEvent::ArchiveCreated {
                package,
                path: &target,
                files,
            },
        );

        if self.archive_hashes {
            // archive and sidecar exist together or not at all
            let hash_path = match write_archive_hash(&target) {
                Ok(path) => path,
                Err(e) => return Err(wrap(self.discard(&target, e))),
            };
            emit(on_event, GenerateEvent::ArchiveHashWritten { path: &hash_path });
        }

        if package.origin == Origin::Fresh {
            match self.stage_manifest(package) {
                Ok(Some(staged)) => emit(
                    on_event,
                    GenerateEvent::ManifestStaged {
                        package,
                        path: &staged,
                    },
                ),
                Ok(None) => {}
                Err(e) => emit(
                    on_event,
                    GenerateEvent::StageFailed {
                        package,
                        error: &e,
                    },
                ),
            }
        }

        Ok(BuiltArchive {
            path: target,
            files,
        })
    }

    /// Remove a failed archive; a removal failure is folded into `cause`.
    fn discard(&self, target: &Path, cause: RepoError) -> RepoError {
        match self.remove_existing(target) {
            Ok(()) => cause,
            Err(cleanup) => RepoError::PartialArchiveLeft {
                path: target.to_path_buf(),
                cleanup: cleanup.to_string(),
                source: Box::new(cause),
            },
        }
    }

    fn remove_existing(&self, target: &Path) -> Result<()> {
        if target.exists() {
            fs::remove_file(target)?;
        }
        let hash_path = archive_hash_path(target);
        if hash_path.exists() {
            fs::remove_file(hash_path)?;
        }
        Ok(())
    }

    fn write_archive(&self, package: &PackageDescriptor, target: &Path) -> Result<usize> {
        let files = package_files(&package.source_path, self.rules)?;
        let dir_name = package.dir_name();

        // fixed timestamp keeps re-runs byte-identical
        let base_options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut zip = ZipWriter::new(File::create(target)?);
        for relative in &files {
            let source = package.source_path.join(relative);
            let name = archive_path_for(package.origin, relative, &dir_name, &package.display_name);

            zip.start_file(name, base_options.unix_permissions(file_mode(&source)?))?;
            let mut reader = File::open(&source)?;
            io::copy(&mut reader, &mut zip)?;
        }
        zip.finish()?;

        Ok(files.len())
    }

    /// Copy a fresh addon's manifest into `{output_dir}/{display_name}/`.
    ///
    /// Returns the staged path when a copy was made, `None` when an identical
    /// copy was already there.
    fn stage_manifest(&self, package: &PackageDescriptor) -> Result<Option<PathBuf>> {
        let staged_dir = self.output_dir.join(&package.display_name);
        fs::create_dir_all(&staged_dir)?;

        let source = package.manifest_path();
        let dest = staged_dir.join(MANIFEST_FILE);
        let content = fs::read(&source)?;

        if dest.exists() && fs::read(&dest)? == content {
            return Ok(None);
        }

        fs::write(&dest, content)?;
        Ok(Some(dest))
    }
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Result<u32> {
    Ok(0o644)
}
