use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;

use repogen_core::checksum::verify_checksum;
use repogen_core::config::{Config, GeneratorConfig};
use repogen_core::{GenerateEvent, RepoError, RepositoryGenerator, Result, RunOutcome, RunSummary};

mod args;
use args::{Cli, Commands, ConfigAction, Shell};

/// How much to print
#[derive(Debug, Clone, Copy)]
struct Verbosity {
    verbose: bool,
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let root = resolve_root(cli.root);
    let config_path = cli.config.unwrap_or_else(|| Config::path(&root));
    let verbosity = Verbosity {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let result = match cli.command.unwrap_or(Commands::Generate) {
        Commands::Generate => load_generator_config(
            &root,
            &config_path,
            &cli.exclude_dirs,
            &cli.exclude_files,
        )
        .and_then(|config| handle_generate(config, verbosity)),
        Commands::List { json } => load_generator_config(
            &root,
            &config_path,
            &cli.exclude_dirs,
            &cli.exclude_files,
        )
        .and_then(|config| handle_list(config, json, verbosity)),
        Commands::Verify => load_generator_config(
            &root,
            &config_path,
            &cli.exclude_dirs,
            &cli.exclude_files,
        )
        .and_then(|config| handle_verify(&config, verbosity)),
        Commands::Config { action } => handle_config(action, &config_path),
        Commands::Completions { shell } => {
            handle_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "repogen", &mut io::stdout());
}

fn resolve_root(cli_root: Option<PathBuf>) -> PathBuf {
    if let Some(root) = cli_root {
        return root;
    }

    if let Ok(root) = std::env::var("REPOGEN_ROOT") {
        return PathBuf::from(root);
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Build run settings from the config file + CLI options
/// Priority: CLI options > config file > defaults
fn load_generator_config(
    root: &Path,
    config_path: &Path,
    exclude_dirs: &[String],
    exclude_files: &[String],
) -> Result<GeneratorConfig> {
    let mut config = Config::load_from(config_path)?.resolve(root);

    for dir in exclude_dirs {
        if !config.rules.is_dir_excluded(dir) {
            config.rules.excluded_dirs.push(dir.clone());
        }
    }

    for file in exclude_files {
        if !config.rules.is_file_excluded(file) {
            config.rules.excluded_files.push(file.clone());
        }
    }

    Ok(config)
}

fn print_event(event: &GenerateEvent<'_>, verbosity: Verbosity) {
    let Verbosity { verbose, quiet } = verbosity;

    match event {
        GenerateEvent::Stage(state) => {
            if verbose {
                println!("  {}", format!("-> {}", state).dimmed());
            }
        }
        GenerateEvent::OutputDirCreated { path } => {
            if !quiet {
                println!("  {} Created directory: {}", "[NEW]".green(), path.display());
            }
        }
        GenerateEvent::PackageFound { package } => {
            if verbose {
                println!(
                    "  {} {} (v{}) in {}",
                    "[FOUND]".cyan(),
                    package.id,
                    package.version,
                    package.source_path.display()
                );
            }
        }
        GenerateEvent::PackageSkipped { candidate } => {
            if !quiet {
                println!("  {} {}", "[WARN]".yellow().bold(), candidate.reason);
            }
        }
        GenerateEvent::ArchiveCreated {
            package,
            path,
            files,
        } => {
            if !quiet {
                println!(
                    "  {} {} ({} {}, {})",
                    "[OK]".green(),
                    path.display(),
                    files,
                    if *files == 1 { "file" } else { "files" },
                    package.origin
                );
            }
        }
        GenerateEvent::ArchiveFailed { package, error } => {
            eprintln!(
                "  {} {} ({}): {}",
                "[ERROR]".red().bold(),
                package.id,
                package.source_path.display(),
                error
            );
        }
        GenerateEvent::ArchiveHashWritten { path } => {
            if verbose {
                println!("  {} {}", "[OK]".green(), path.display());
            }
        }
        GenerateEvent::ManifestStaged { package, path } => {
            if verbose {
                println!(
                    "  {} Staged {} manifest: {}",
                    "[NEW]".green(),
                    package.id,
                    path.display()
                );
            }
        }
        GenerateEvent::StageFailed { package, error } => {
            if !quiet {
                println!(
                    "  {} Could not stage {} manifest: {}",
                    "[WARN]".yellow().bold(),
                    package.id,
                    error
                );
            }
        }
        GenerateEvent::IndexWritten { path, packages } => {
            if !quiet {
                println!(
                    "  {} Generated {} ({} addons)",
                    "[OK]".green(),
                    path.display(),
                    packages
                );
            }
        }
        GenerateEvent::ChecksumWritten { path, digest } => {
            if !quiet {
                println!(
                    "  {} Generated {} with hash: {}",
                    "[OK]".green(),
                    path.display(),
                    digest
                );
            }
        }
        GenerateEvent::ChecksumFailed { error } => {
            eprintln!("  {} {}", "[ERROR]".red().bold(), error);
        }
    }
}

fn handle_generate(config: GeneratorConfig, verbosity: Verbosity) -> Result<()> {
    let generator = RepositoryGenerator::new(config);

    if !verbosity.quiet {
        println!();
        println!("Root: {}", generator.config().root.display().to_string().cyan());
        println!("Output: {}", generator.config().output_dir.display());
        println!();
        println!("Generating repository...");
    }

    let on_event = |event: &GenerateEvent<'_>| print_event(event, verbosity);
    let outcome = generator.run(Some(&on_event))?;

    match outcome {
        RunOutcome::NoPackages { .. } => {
            if !verbosity.quiet {
                println!();
                println!("{}", "No valid addon directories found!".yellow());
            }
        }
        RunOutcome::Completed(summary) => {
            if !verbosity.quiet {
                print_summary(&summary);
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Found {} addon{}:",
        summary.packages.len(),
        if summary.packages.len() == 1 { "" } else { "s" }
    );
    for package in &summary.packages {
        println!(
            "  - {} (v{}) in {}",
            package.id.cyan(),
            package.version,
            package.origin.location()
        );
    }

    println!();
    if !summary.skipped.is_empty() {
        println!(
            "{} {} candidate(s) skipped",
            "Warning:".yellow(),
            summary.skipped.len()
        );
    }
    if !summary.failures.is_empty() {
        println!(
            "{} {} archive(s) failed: {}",
            "Warning:".yellow(),
            summary.failures.len(),
            summary
                .failures
                .iter()
                .map(|f| format!("{}-{}", f.id, f.version))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if summary.checksum.is_none() {
        println!("{} checksum was not written", "Warning:".yellow());
    }

    println!(
        "{}",
        "Repository generation completed successfully!".green().bold()
    );
}

fn handle_list(config: GeneratorConfig, json: bool, verbosity: Verbosity) -> Result<()> {
    let generator = RepositoryGenerator::new(config);

    if json {
        let result = generator.scan(None)?;
        let value = serde_json::json!({
            "packages": result.packages,
            "skipped": result.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let on_event = |event: &GenerateEvent<'_>| {
        if let GenerateEvent::PackageSkipped { .. } = event {
            print_event(event, verbosity);
        }
    };
    let result = generator.scan(Some(&on_event))?;

    if result.packages.is_empty() {
        println!("{}", "No valid addon directories found!".yellow());
        return Ok(());
    }

    println!();
    println!("{}", "Addons:".cyan().bold());
    for package in &result.packages {
        let origin = match package.origin {
            repogen_core::Origin::Fresh => format!("[{}]", package.origin).green(),
            repogen_core::Origin::Staged => format!("[{}]", package.origin).blue(),
        };
        println!(
            "  {} {} {} -> {}",
            origin,
            package.id.bold(),
            format!("v{}", package.version).dimmed(),
            package.archive_name()
        );
        if verbosity.verbose {
            println!("      {}", package.source_path.display().to_string().dimmed());
        }
    }
    println!();

    Ok(())
}

fn handle_verify(config: &GeneratorConfig, verbosity: Verbosity) -> Result<()> {
    let digest = verify_checksum(&config.index_path, &config.checksum_path)?;
    if !verbosity.quiet {
        println!(
            "{} {} matches {} ({})",
            "[OK]".green(),
            config.index_path.display(),
            config.checksum_path.display(),
            digest
        );
    }
    Ok(())
}

fn handle_config(action: ConfigAction, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_from(config_path)?;
            match config.get(&key) {
                Some(value) => {
                    println!("{}", value);
                }
                None => {
                    return Err(RepoError::ConfigKeyNotFound { key });
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(config_path)?;
            config.set(&key, &value)?;
            config.save_to(config_path)?;
            println!("{} {} = {}", "Set:".green(), key, value);
        }
        ConfigAction::Show => {
            let config = Config::load_from(config_path)?;
            println!();
            for (key, value) in config.list() {
                println!("{} = {}", key.cyan(), value);
            }
            println!();
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Init => {
            Config::init_at(config_path)?;
            println!("{} {}", "Initialized:".green(), config_path.display());
        }
    }

    Ok(())
}
