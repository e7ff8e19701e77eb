use std::fs;
use std::path::{Path, PathBuf};

use crate::config::GeneratorConfig;
use crate::error::{RepoError, Result};
use crate::event::{emit, EventCallback, GenerateEvent};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::package::{Origin, PackageDescriptor, SkippedCandidate};
use crate::walk::ExclusionRules;

/// Addons found by a scan, plus the candidates that were dropped
#[derive(Debug, Default)]
pub struct ScanResult {
    pub packages: Vec<PackageDescriptor>,
    pub skipped: Vec<SkippedCandidate>,
}

/// Discovers addon directories under the source root and the staged output root.
///
/// Each root is listed in file-name order, source root first. Listing order is
/// not something the filesystem guarantees, so it is imposed here.
pub struct DirectoryScanner<'a> {
    root: &'a Path,
    output_dir: &'a Path,
    rules: &'a ExclusionRules,
}

impl<'a> DirectoryScanner<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            root: &config.root,
            output_dir: &config.output_dir,
            rules: &config.rules,
        }
    }

    pub fn scan(&self, on_event: EventCallback<'_>) -> Result<ScanResult> {
        if !self.root.is_dir() {
            return Err(RepoError::RootNotFound {
                path: self.root.to_path_buf(),
            });
        }

        let mut result = ScanResult::default();

        for dir in list_dirs(self.root)? {
            let name = dir_name(&dir);
            if self.rules.is_dir_excluded(&name) || same_dir(&dir, self.output_dir) {
                continue;
            }
            self.consider(&dir, Origin::Fresh, &mut result, on_event);
        }

        if self.output_dir.is_dir() {
            for dir in list_dirs(self.output_dir)? {
                self.consider(&dir, Origin::Staged, &mut result, on_event);
            }
        }

        Ok(result)
    }

    fn consider(
        &self,
        dir: &Path,
        origin: Origin,
        result: &mut ScanResult,
        on_event: EventCallback<'_>,
    ) {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return;
        }

        match Manifest::load(&manifest_path) {
            Ok(manifest) => {
                let package = PackageDescriptor {
                    id: manifest.id,
                    version: manifest.version,
                    source_path: dir.to_path_buf(),
                    display_name: dir_name(dir),
                    origin,
                    raw_manifest: manifest.root_element,
                };
                emit(on_event, GenerateEvent::PackageFound { package: &package });
                result.packages.push(package);
            }
            Err(e) => {
                let candidate = SkippedCandidate {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                };
                emit(
                    on_event,
                    GenerateEvent::PackageSkipped {
                        candidate: &candidate,
                    },
                );
                result.skipped.push(candidate);
            }
        }
    }
}

/// Immediate subdirectories of `dir`, sorted by name
fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn same_dir(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn addon(dir: &Path, id: &str, version: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            format!(r#"<addon id="{}" version="{}" name="x"/>"#, id, version),
        )
        .unwrap();
    }

    fn setup() -> (tempfile::TempDir, GeneratorConfig) {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = GeneratorConfig::for_root(tmp.path());
        (tmp, config)
    }

    #[test]
    fn finds_fresh_then_staged() {
        let (tmp, config) = setup();
        addon(&tmp.path().join("b.addon"), "b.addon", "1.0");
        addon(&tmp.path().join("a.addon"), "a.addon", "2.0");
        addon(&config.output_dir.join("c.addon"), "c.addon", "3.0");

        let result = DirectoryScanner::new(&config).scan(None).unwrap();
        let found: Vec<_> = result
            .packages
            .iter()
            .map(|p| (p.id.as_str(), p.version.as_str(), p.origin))
            .collect();
        assert_eq!(
            found,
            vec![
                ("a.addon", "2.0", Origin::Fresh),
                ("b.addon", "1.0", Origin::Fresh),
                ("c.addon", "3.0", Origin::Staged),
            ]
        );
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn display_name_is_directory_name() {
        let (tmp, config) = setup();
        addon(&tmp.path().join("my-folder"), "plugin.real.id", "1.0");

        let result = DirectoryScanner::new(&config).scan(None).unwrap();
        assert_eq!(result.packages[0].display_name, "my-folder");
        assert_eq!(result.packages[0].id, "plugin.real.id");
        assert_eq!(result.packages[0].source_path, tmp.path().join("my-folder"));
    }

    #[test]
    fn raw_manifest_is_captured() {
        let (tmp, config) = setup();
        addon(&tmp.path().join("a"), "a", "1");

        let result = DirectoryScanner::new(&config).scan(None).unwrap();
        assert_eq!(
            result.packages[0].raw_manifest,
            r#"<addon id="a" version="1" name="x"/>"#
        );
    }

    #[test]
    fn ignores_excluded_dirs_output_dir_and_plain_dirs() {
        let (tmp, config) = setup();
        addon(&tmp.path().join(".git"), "git.addon", "1");
        addon(&tmp.path().join("__pycache__"), "cache.addon", "1");
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("addon.xml"), "<addon/>").unwrap();
        // the output dir itself is never a fresh candidate
        fs::create_dir_all(&config.output_dir).unwrap();
        fs::write(
            config.output_dir.join(MANIFEST_FILE),
            r#"<addon id="zips" version="1"/>"#,
        )
        .unwrap();

        let result = DirectoryScanner::new(&config).scan(None).unwrap();
        assert!(result.packages.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn invalid_manifests_are_skipped_and_reported() {
        let (tmp, config) = setup();
        addon(&tmp.path().join("good"), "good", "1.0");
        fs::create_dir_all(tmp.path().join("no-version")).unwrap();
        fs::write(
            tmp.path().join("no-version").join(MANIFEST_FILE),
            r#"<addon id="x"/>"#,
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("broken")).unwrap();
        fs::write(
            tmp.path().join("broken").join(MANIFEST_FILE),
            "<addon id=\"y\" version=\"1\">",
        )
        .unwrap();

        let skipped_seen = RefCell::new(Vec::new());
        let on_event = |event: &GenerateEvent<'_>| {
            if let GenerateEvent::PackageSkipped { candidate } = event {
                skipped_seen.borrow_mut().push(candidate.path.clone());
            }
        };

        let result = DirectoryScanner::new(&config)
            .scan(Some(&on_event))
            .unwrap();

        assert_eq!(result.packages.len(), 1);
        assert_eq!(result.packages[0].id, "good");
        assert_eq!(result.skipped.len(), 2);
        assert!(result.skipped[1].reason.contains("version"));
        assert_eq!(
            *skipped_seen.borrow(),
            vec![tmp.path().join("broken"), tmp.path().join("no-version")]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = GeneratorConfig::for_root(&tmp.path().join("absent"));
        assert!(matches!(
            DirectoryScanner::new(&config).scan(None),
            Err(RepoError::RootNotFound { .. })
        ));
    }

    #[test]
    fn missing_output_dir_is_fine() {
        let (tmp, config) = setup();
        addon(&tmp.path().join("a"), "a", "1");
        let result = DirectoryScanner::new(&config).scan(None).unwrap();
        assert_eq!(result.packages.len(), 1);
    }
}
