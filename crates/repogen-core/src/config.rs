use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RepoError, Result};
use crate::walk::{ExclusionRules, DEFAULT_EXCLUDED_DIRS, DEFAULT_EXCLUDED_FILES};

const CONFIG_FILE: &str = "repogen.toml";

pub const DEFAULT_OUTPUT_DIR: &str = "zips";
pub const DEFAULT_INDEX_FILE: &str = "addons.xml";
pub const DEFAULT_CHECKSUM_FILE: &str = "addons.xml.md5";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# repogen configuration file
# Location: <source root>/repogen.toml

[output]
# Staged output directory, relative to the source root.
# Holds the archives, the index, the checksum and staged addon copies.
dir = "zips"

# Index and checksum file names inside the output directory
index = "addons.xml"
checksum = "addons.xml.md5"

# Write a <archive>.sha256 file next to every archive
archive_hashes = false

[exclude]
# Directory names pruned at every depth
dirs = [".git", ".github", ".idea", "__pycache__"]

# File names skipped at every depth
files = [".gitignore", ".gitattributes", "repository.generator.py", "README.md"]
"#;

/// Repository configuration as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub exclude: ExcludeConfig,
}

/// Output layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default = "default_checksum")]
    pub checksum: String,

    #[serde(default)]
    pub archive_hashes: bool,
}

/// Exclusion sets applied during discovery and archiving
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExcludeConfig {
    #[serde(default = "default_excluded_dirs")]
    pub dirs: Vec<String>,

    #[serde(default = "default_excluded_files")]
    pub files: Vec<String>,
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

fn default_index() -> String {
    DEFAULT_INDEX_FILE.to_string()
}

fn default_checksum() -> String {
    DEFAULT_CHECKSUM_FILE.to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect()
}

fn default_excluded_files() -> Vec<String> {
    DEFAULT_EXCLUDED_FILES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            index: default_index(),
            checksum: default_checksum(),
            archive_hashes: false,
        }
    }
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        Self {
            dirs: default_excluded_dirs(),
            files: default_excluded_files(),
        }
    }
}

impl Config {
    /// Load config from the source root, falling back to defaults
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_from(&Self::path(root))
    }

    /// Load config from an explicit file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| RepoError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Save config to the source root
    pub fn save(&self, root: &Path) -> Result<()> {
        self.save_to(&Self::path(root))
    }

    /// Save config to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| RepoError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        fs::write(path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }

    /// Initialize config with default template (rich comments)
    pub fn init(root: &Path) -> Result<PathBuf> {
        let path = Self::path(root);
        Self::init_at(&path)?;
        Ok(path)
    }

    /// Write the default template to `path` unless a file already exists there
    pub fn init_at(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        }
        Ok(())
    }

    /// Get a config value by dot-notation key
    pub fn get(&self, key: &str) -> Option<String> {
        self.list()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Set a config value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output.dir" => self.output.dir = value.trim().to_string(),
            "output.index" => self.output.index = value.trim().to_string(),
            "output.checksum" => self.output.checksum = value.trim().to_string(),
            "output.archive_hashes" => {
                self.output.archive_hashes = parse_bool(key, value)?;
            }
            "exclude.dirs" => self.exclude.dirs = parse_string_list(value),
            "exclude.files" => self.exclude.files = parse_string_list(value),
            _ => {
                return Err(RepoError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// List all config keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("output.dir".to_string(), self.output.dir.clone()),
            ("output.index".to_string(), self.output.index.clone()),
            ("output.checksum".to_string(), self.output.checksum.clone()),
            (
                "output.archive_hashes".to_string(),
                self.output.archive_hashes.to_string(),
            ),
            (
                "exclude.dirs".to_string(),
                format!("{:?}", self.exclude.dirs),
            ),
            (
                "exclude.files".to_string(),
                format!("{:?}", self.exclude.files),
            ),
        ]
    }

    pub fn to_exclusion_rules(&self) -> ExclusionRules {
        ExclusionRules {
            excluded_dirs: self.exclude.dirs.clone(),
            excluded_files: self.exclude.files.clone(),
        }
    }

    /// Resolve this config against a source root into the immutable run settings
    pub fn resolve(&self, root: &Path) -> GeneratorConfig {
        let output_dir = root.join(&self.output.dir);
        GeneratorConfig {
            root: root.to_path_buf(),
            index_path: output_dir.join(&self.output.index),
            checksum_path: output_dir.join(&self.output.checksum),
            output_dir,
            rules: self.to_exclusion_rules(),
            archive_hashes: self.output.archive_hashes,
        }
    }
}

/// Settings for one generator run, resolved once at startup
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Primary source root holding fresh addons
    pub root: PathBuf,
    /// Staged output root
    pub output_dir: PathBuf,
    pub index_path: PathBuf,
    pub checksum_path: PathBuf,
    pub rules: ExclusionRules,
    pub archive_hashes: bool,
}

impl GeneratorConfig {
    /// Default layout for a source root (`zips/addons.xml`, `zips/addons.xml.md5`)
    pub fn for_root(root: &Path) -> Self {
        Config::default().resolve(root)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(RepoError::ConfigParse {
            path: PathBuf::from(CONFIG_FILE),
            message: format!("invalid boolean for {}: {}", key, value),
        }),
    }
}

/// Parse a comma-separated or JSON-like list string
fn parse_string_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    let inner = if trimmed.starts_with('[') && trimmed.ends_with(']') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    inner
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_list_comma() {
        let result = parse_string_list(".git,node_modules");
        assert_eq!(result, vec![".git", "node_modules"]);
    }

    #[test]
    fn test_parse_string_list_json() {
        let result = parse_string_list(r#"[".git", "node_modules"]"#);
        assert_eq!(result, vec![".git", "node_modules"]);
    }

    #[test]
    fn test_parse_string_list_empty() {
        assert!(parse_string_list("[]").is_empty());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output.dir, "zips");
        assert!(config.exclude.dirs.contains(&".git".to_string()));
        assert!(config.exclude.files.contains(&"README.md".to_string()));
    }

    #[test]
    fn test_init_template_parses_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = Config::init(tmp.path()).unwrap();
        assert!(path.exists());

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(
            Config::path(tmp.path()),
            "[exclude]\ndirs = [\"node_modules\"]\n",
        )
        .unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.exclude.dirs, vec!["node_modules"]);
        assert_eq!(config.exclude.files, default_excluded_files());
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(Config::path(tmp.path()), "[output\ndir = ").unwrap();

        let err = Config::load(tmp.path()).unwrap_err();
        assert!(matches!(err, RepoError::ConfigParse { .. }));
    }

    #[test]
    fn test_config_get_set() {
        let mut config = Config::default();

        config.set("exclude.dirs", ".git,node_modules").unwrap();
        assert_eq!(config.exclude.dirs, vec![".git", "node_modules"]);

        config.set("output.archive_hashes", "true").unwrap();
        assert!(config.output.archive_hashes);
        assert_eq!(config.get("output.archive_hashes").unwrap(), "true");

        assert!(config.get("output.nope").is_none());
        assert!(matches!(
            config.set("output.nope", "x"),
            Err(RepoError::ConfigKeyNotFound { .. })
        ));
        assert!(config.set("output.archive_hashes", "maybe").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.dir = "dist".to_string();
        config.save(tmp.path()).unwrap();

        let loaded = Config::load(tmp.path()).unwrap();
        assert_eq!(loaded.output.dir, "dist");
    }

    #[test]
    fn test_resolve_default_paths() {
        let root = Path::new("/repo");
        let resolved = Config::default().resolve(root);
        assert_eq!(resolved.output_dir, Path::new("/repo/zips"));
        assert_eq!(resolved.index_path, Path::new("/repo/zips/addons.xml"));
        assert_eq!(
            resolved.checksum_path,
            Path::new("/repo/zips/addons.xml.md5")
        );
        assert!(resolved.rules.is_dir_excluded(".git"));
        assert!(resolved.rules.is_file_excluded("README.md"));
    }
}
