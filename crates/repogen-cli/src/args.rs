use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "repogen")]
#[command(about = "Build a distributable addon repository from a directory of addons")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Source root holding addon directories (default: current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file (default: <root>/repogen.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Exclude additional directory names (e.g., --exclude-dir=node_modules)
    #[arg(long = "exclude-dir", value_name = "NAME", global = true)]
    pub exclude_dirs: Vec<String>,

    /// Exclude additional file names (e.g., --exclude-file=.DS_Store)
    #[arg(long = "exclude-file", value_name = "NAME", global = true)]
    pub exclude_files: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild archives, addons.xml and its checksum (default)
    Generate,

    /// List addons that would be packaged, without writing anything
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the stored checksum matches the index on disk
    Verify,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a commented default config file
    Init,

    /// Show all config values
    Show,

    /// Get a config value
    Get {
        /// Config key (e.g., exclude.dirs)
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., output.archive_hashes)
        key: String,
        /// New value (lists: comma-separated or ["a", "b"])
        value: String,
    },

    /// Print the config file path
    Path,
}
