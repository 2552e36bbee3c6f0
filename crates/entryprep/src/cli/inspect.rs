//! The `entryprep inspect` command: validate an entry table without running it.

use clap::Args;
use entryprep_core::config::run_output_root;
use entryprep_core::{Config, InputTable};
use std::path::PathBuf;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Entry table to check
    #[arg(required = true)]
    pub input: PathBuf,
}

/// What a run over the table would look like.
#[derive(Debug)]
struct TableSummary {
    entries: usize,
    blank: usize,
    run_root: PathBuf,
}

fn summarize(table: &InputTable, config: &Config) -> TableSummary {
    let blank = table
        .records
        .iter()
        .filter(|r| r.file_name.trim().is_empty() || r.image_url.trim().is_empty())
        .count();
    TableSummary {
        entries: table.len(),
        blank,
        run_root: run_output_root(&config.output_parent(&table.path), &table.path),
    }
}

/// Execute the inspect command.
pub async fn execute(args: InspectArgs, config: &Config) -> anyhow::Result<()> {
    let table = InputTable::load(&args.input)?;
    let summary = summarize(&table, config);

    println!("Table:    {}", table.path.display());
    println!("Entries:  {}", summary.entries);
    if summary.blank > 0 {
        println!("Blank:    {} (will be reported as invalid records)", summary.blank);
    }
    println!("Run root: {}", summary.run_root.display());
    Ok(())
}
