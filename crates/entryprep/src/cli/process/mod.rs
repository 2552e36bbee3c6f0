//! The `entryprep process` command for running an entry table.

mod render;
mod setup;

use clap::Args;
use entryprep_core::{BatchPipeline, Config, PipelineEvent};
use std::path::PathBuf;

use render::{print_summary, EventRenderer};
use setup::setup_run;

/// Arguments for the `process` command.
#[derive(Args, Debug, Default)]
pub struct ProcessArgs {
    /// Entry table (CSV with 'File Name' and 'Image: URL' columns)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory to create the run folder in (defaults to the table's directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep submitted resolution instead of fitting within 3840x2160
    #[arg(long)]
    pub no_limit_size: bool,

    /// Carry EXIF metadata into the full-size images
    #[arg(long)]
    pub keep_metadata: bool,

    /// Number repeated entrant IDs (123-Title.jpg -> 123-1 Title.jpg)
    #[arg(long)]
    pub sequence: bool,

    /// Per-image download timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print events as JSON lines on stdout instead of a progress bar
    #[arg(long)]
    pub json_events: bool,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_run(&args, config)?;
    tracing::info!("Run folder: {:?}", ctx.output_root);

    let pipeline = BatchPipeline::new(ctx.config)?;

    // Ctrl+C stops the run between records; reports are still written.
    let cancel = pipeline.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current entry");
            cancel.cancel();
        }
    });

    let mut events = pipeline.start(ctx.input, ctx.output_root.clone());
    let mut renderer = EventRenderer::new(args.json_events);
    let mut completion = None;
    while let Some(event) = events.recv().await {
        renderer.handle(&event)?;
        if let PipelineEvent::Completed(done) = event {
            completion = Some(done);
        }
    }
    let report = events.finish().await?;
    renderer.finish();

    let Some(done) = completion else {
        anyhow::bail!("Run ended without a completion event");
    };

    if !args.json_events && report.layout.is_some() {
        print_summary(&done, &ctx.output_root);
    }

    if !done.ok {
        anyhow::bail!("{}", done.summary);
    }
    Ok(())
}
