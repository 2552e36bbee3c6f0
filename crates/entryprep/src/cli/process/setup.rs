//! Run setup: config overrides and output folder resolution.

use entryprep_core::config::run_output_root;
use entryprep_core::Config;
use std::path::PathBuf;

use super::ProcessArgs;

/// Everything resolved before a run starts.
#[derive(Debug)]
pub struct RunContext {
    pub config: Config,
    pub input: PathBuf,
    pub output_root: PathBuf,
}

/// Validate the input, apply CLI overrides and resolve the run folder.
pub fn setup_run(args: &ProcessArgs, mut config: Config) -> anyhow::Result<RunContext> {
    if !args.input.is_file() {
        anyhow::bail!(
            "Input table does not exist: {:?}\n\n  Hint: Pass the CSV exported from the entry system.",
            args.input
        );
    }

    if args.no_limit_size {
        config.processing.limit_full_size = false;
    }
    if args.keep_metadata {
        config.processing.remove_metadata = false;
    }
    if args.sequence {
        config.processing.add_sequence_numbers = true;
    }
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_secs = timeout;
    }
    config.validate()?;

    let parent = args
        .output
        .clone()
        .unwrap_or_else(|| config.output_parent(&args.input));
    let output_root = run_output_root(&parent, &args.input);

    tracing::debug!(
        "Options: limit_full_size={} remove_metadata={} add_sequence_numbers={}",
        config.processing.limit_full_size,
        config.processing.remove_metadata,
        config.processing.add_sequence_numbers
    );

    Ok(RunContext {
        config,
        input: args.input.clone(),
        output_root,
    })
}
