use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::Result;

/// Directory names never descended into
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".git", ".github", ".idea", "__pycache__"];

/// File names never packaged
pub const DEFAULT_EXCLUDED_FILES: &[&str] = &[
    ".gitignore",
    ".gitattributes",
    "repository.generator.py",
    "README.md",
];

/// Name-based exclusion sets, applied uniformly at every depth
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExclusionRules {
    pub excluded_dirs: Vec<String>,
    pub excluded_files: Vec<String>,
}

impl ExclusionRules {
    pub fn with_defaults() -> Self {
        Self {
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            excluded_files: DEFAULT_EXCLUDED_FILES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Add a directory name to exclude
    pub fn exclude_dir(mut self, name: impl Into<String>) -> Self {
        self.excluded_dirs.push(name.into());
        self
    }

    /// Add a file name to exclude
    pub fn exclude_file(mut self, name: impl Into<String>) -> Self {
        self.excluded_files.push(name.into());
        self
    }

    pub fn is_dir_excluded(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }

    pub fn is_file_excluded(&self, name: &str) -> bool {
        self.excluded_files.iter().any(|f| f == name)
    }

    /// Entry predicate used to prune the walk; the walk root itself is always kept.
    fn keep(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            !self.is_dir_excluded(&name)
        } else {
            !self.is_file_excluded(&name)
        }
    }
}

/// Collect every file under `base` as a path relative to `base`.
///
/// Excluded directories are pruned before descent, so nothing beneath them is
/// ever visited. Output is sorted by file name at each level, which keeps
/// archive contents stable across runs. Any traversal error is returned
/// rather than skipped.
pub fn package_files(base: &Path, rules: &ExclusionRules) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| rules.keep(e));

    for entry in walker {
        let entry = entry?;
        // follows symlinks, like the file itself will be read
        if !entry.path().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(base) {
            files.push(relative.to_path_buf());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn defaults_match_repository_conventions() {
        let rules = ExclusionRules::with_defaults();
        assert!(rules.is_dir_excluded(".git"));
        assert!(rules.is_dir_excluded("__pycache__"));
        assert!(rules.is_file_excluded(".gitignore"));
        assert!(rules.is_file_excluded("README.md"));
        assert!(!rules.is_dir_excluded("resources"));
        assert!(!rules.is_file_excluded("addon.xml"));
    }

    #[test]
    fn builder_adds_exclusions() {
        let rules = ExclusionRules::default()
            .exclude_dir("node_modules")
            .exclude_file(".DS_Store");
        assert!(rules.is_dir_excluded("node_modules"));
        assert!(rules.is_file_excluded(".DS_Store"));
        assert!(!rules.is_dir_excluded(".git"));
    }

    #[test]
    fn prunes_excluded_dirs_at_any_depth() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = tmp.path();
        touch(&base.join("addon.xml"));
        touch(&base.join(".git/HEAD"));
        touch(&base.join("resources/lib/main.py"));
        touch(&base.join("resources/lib/__pycache__/main.cpython-311.pyc"));
        touch(&base.join("resources/.idea/deep/nested/file.txt"));

        let files = package_files(base, &ExclusionRules::with_defaults()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("addon.xml"),
                PathBuf::from("resources/lib/main.py"),
            ]
        );
    }

    #[test]
    fn skips_excluded_files_at_any_depth() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = tmp.path();
        touch(&base.join("README.md"));
        touch(&base.join("icon.png"));
        touch(&base.join("resources/README.md"));
        touch(&base.join("resources/.gitignore"));
        touch(&base.join("resources/settings.xml"));

        let files = package_files(base, &ExclusionRules::with_defaults()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("icon.png"),
                PathBuf::from("resources/settings.xml"),
            ]
        );
    }

    #[test]
    fn excluded_name_on_file_only_matches_file_set() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = tmp.path();
        // a plain file sharing a directory-exclusion name is kept
        touch(&base.join("__pycache__"));

        let files = package_files(base, &ExclusionRules::with_defaults()).unwrap();
        assert_eq!(files, vec![PathBuf::from("__pycache__")]);
    }

    #[test]
    fn missing_base_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = package_files(&tmp.path().join("absent"), &ExclusionRules::default());
        assert!(result.is_err());
    }
}
