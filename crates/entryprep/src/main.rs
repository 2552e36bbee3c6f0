//! EntryPrep CLI - prepare competition image entries for judging.
//!
//! Reads an entry table exported from the entry system, downloads each image,
//! and writes judging-ready full-size and thumbnail JPEGs with a metadata
//! report and a list of entries that could not be processed.
//!
//! # Usage
//!
//! ```bash
//! # Process a table into ./autumn-salon/
//! entryprep process autumn-salon.csv
//!
//! # Keep submitted resolution and EXIF, number repeated entrant IDs
//! entryprep process autumn-salon.csv --no-limit-size --keep-metadata --sequence
//!
//! # Check a table before running it
//! entryprep inspect autumn-salon.csv
//!
//! # View configuration
//! entryprep config show
//! ```

use clap::{Parser, Subcommand};
use entryprep_core::Config;
use std::path::Path;

mod cli;
mod logging;

/// EntryPrep - download, normalize and archive competition image entries.
#[derive(Parser, Debug)]
#[command(name = "entryprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Download and prepare every entry in a table
    Process(cli::process::ProcessArgs),

    /// Check an entry table without downloading anything
    Inspect(cli::inspect::InspectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&Config::default_path());
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("EntryPrep v{}", entryprep_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Inspect(args) => cli::inspect::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

/// Load the config file, falling back to defaults when it is unreadable.
///
/// Logging isn't initialized yet, so the warning goes through eprintln.
fn load_config(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match Config::load_from(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `entryprep config path`."
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::try_parse_from([
            "entryprep",
            "process",
            "entries.csv",
            "-o",
            "out",
            "--sequence",
            "--keep-metadata",
            "--timeout",
            "30",
        ])
        .unwrap();
        let Commands::Process(args) = cli.command else {
            panic!("Expected process command");
        };
        assert_eq!(args.input, std::path::PathBuf::from("entries.csv"));
        assert!(args.sequence);
        assert!(args.keep_metadata);
        assert!(!args.no_limit_size);
        assert_eq!(args.timeout, Some(30));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let parsed = Cli::try_parse_from(["entryprep", "process", "entries.csv", "--timeout", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processing\nremove_metadata = maybe\n").unwrap();

        let config = load_config(&path);
        assert!(config.processing.remove_metadata);
        assert!(!config.processing.add_sequence_numbers);
    }

    #[test]
    fn test_missing_config_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml"));
        assert!(config.processing.limit_full_size);
    }

    #[test]
    fn test_valid_config_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processing]\nadd_sequence_numbers = true\n").unwrap();

        assert!(load_config(&path).processing.add_sequence_numbers);
    }
}
