//! Batch runs: table validation, sequential record processing, reports and
//! the progress event stream.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::PipelineError;
use crate::report::ReportWriter;
use crate::table::InputTable;
use crate::types::{
    CompletionEvent, FailureRecord, ImageMetadataRecord, PipelineEvent, ProcessingOutcome,
    ProcessingStats, ProgressEvent, Severity,
};

use super::channel::{bounded_channel, emit};
use super::fetch::{HttpFetcher, ImageFetcher};
use super::layout::{OutputLayout, FAILURE_REPORT};
use super::processor::RecordProcessor;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Running,
    /// All records were attempted and the reports written
    Completed,
    /// Stopped between records on request; reports cover what was processed
    Cancelled,
    /// The input table lacks required columns; nothing was written
    Rejected,
    /// Table unreadable, or directories or reports could not be written
    Failed,
}

/// Shared flag checked between records.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop before its next record.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    pub stats: ProcessingStats,
    /// Successful records in input order
    pub metadata: Vec<ImageMetadataRecord>,
    /// Failed records in input order
    pub failures: Vec<FailureRecord>,
    /// Present once the output directories exist
    pub layout: Option<OutputLayout>,
}

impl RunReport {
    fn early_exit(state: RunState) -> Self {
        Self {
            state,
            stats: ProcessingStats::default(),
            metadata: Vec::new(),
            failures: Vec::new(),
            layout: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state == RunState::Completed
    }
}

/// Event stream for a run started with [`BatchPipeline::start`].
pub struct EventStream {
    events: mpsc::Receiver<PipelineEvent>,
    handle: JoinHandle<RunReport>,
}

impl EventStream {
    /// Next event; `None` once the run has finished and the stream is drained.
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Wait for the run and return its report.
    ///
    /// Undelivered events are discarded.
    pub async fn finish(self) -> Result<RunReport, PipelineError> {
        drop(self.events);
        self.handle
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))
    }
}

/// Runs an input table through the record processor, one record at a time.
pub struct BatchPipeline {
    config: Config,
    fetcher: Arc<dyn ImageFetcher>,
    cancel: CancellationFlag,
}

impl BatchPipeline {
    /// Create a pipeline that fetches over HTTP.
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let fetcher =
            HttpFetcher::new(&config.fetch).map_err(|e| PipelineError::HttpClient(e.to_string()))?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a pipeline with a custom fetcher.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            config,
            fetcher,
            cancel: CancellationFlag::new(),
        }
    }

    /// Flag that stops this pipeline's runs between records.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a run on a background task.
    ///
    /// The stream yields progress events and ends with exactly one
    /// [`PipelineEvent::Completed`].
    pub fn start(self, input: PathBuf, output_root: PathBuf) -> EventStream {
        let (tx, rx) = bounded_channel(&self.config.pipeline);
        let handle = tokio::spawn(async move { self.run(&input, &output_root, &tx).await });
        EventStream { events: rx, handle }
    }

    /// Run the table at `input`, writing into `output_root`.
    ///
    /// Never fails: run-fatal problems end in a `Rejected` or `Failed` state
    /// and a completion event with `ok = false`.
    pub async fn run(
        &self,
        input: &Path,
        output_root: &Path,
        events: &mpsc::Sender<PipelineEvent>,
    ) -> RunReport {
        let start = Instant::now();
        let mut state = RunState::Idle;

        transition(&mut state, RunState::Validating);
        let table = match InputTable::load(input) {
            Ok(table) => table,
            Err(e) => {
                let next = match e {
                    PipelineError::TableRejected { .. } => RunState::Rejected,
                    _ => RunState::Failed,
                };
                return self.abort(next, &e, ProcessingStats::default(), events).await;
            }
        };

        let layout = OutputLayout::new(output_root, &self.config.processing);
        if let Err(e) = layout.create_dirs() {
            let stats = ProcessingStats {
                total: table.len(),
                ..ProcessingStats::default()
            };
            return self.abort(RunState::Failed, &e, stats, events).await;
        }

        transition(&mut state, RunState::Running);
        let total = table.len();
        tracing::info!("Processing {} entries from {:?}", total, table.path);
        emit(
            events,
            PipelineEvent::Progress(ProgressEvent::info(
                0,
                format!("Found {total} entries in {}", table.path.display()),
            )),
        )
        .await;
        emit(
            events,
            PipelineEvent::Progress(ProgressEvent::info(
                0,
                format!("Saving to {}", layout.root.display()),
            )),
        )
        .await;

        let mut processor = RecordProcessor::new(&self.config, Arc::clone(&self.fetcher));
        let mut metadata = Vec::new();
        let mut failures = Vec::new();
        let mut cancelled = false;

        for (i, record) in table.records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancelled after {} of {} entries", i, total);
                cancelled = true;
                break;
            }

            let percent = percent_complete(i, total);
            let event = match processor.process(record, &layout).await {
                ProcessingOutcome::Success {
                    metadata: row,
                    resized,
                    original_size,
                } => {
                    let status = if resized { "resized" } else { "original size" };
                    let message = format!(
                        "Processed {}/{}: {} ({}, {})",
                        i + 1,
                        total,
                        row.file_name,
                        original_size,
                        status
                    );
                    metadata.push(row);
                    ProgressEvent {
                        percent,
                        message,
                        severity: Severity::Success,
                    }
                }
                ProcessingOutcome::Failure(failure) => {
                    let message = format!(
                        "Failed {}/{}: {}: {}",
                        i + 1,
                        total,
                        failure.original_file_name,
                        failure.error_message
                    );
                    failures.push(failure);
                    ProgressEvent {
                        percent,
                        message,
                        severity: Severity::Failure,
                    }
                }
            };
            emit(events, PipelineEvent::Progress(event)).await;
        }

        let mut report = RunReport {
            state,
            stats: ProcessingStats {
                total,
                succeeded: metadata.len(),
                failed: failures.len(),
                total_seconds: 0.0,
            },
            metadata,
            failures,
            layout: Some(layout),
        };

        if let Err(e) = self.write_reports(&report) {
            report.stats.total_seconds = start.elapsed().as_secs_f64();
            let stats = report.stats.clone();
            report.state = RunState::Failed;
            tracing::error!("{}", e);
            emit(events, completion(false, e.to_string(), stats)).await;
            return report;
        }

        report.stats.total_seconds = start.elapsed().as_secs_f64();
        let (ok, summary) = if cancelled {
            transition(&mut report.state, RunState::Cancelled);
            (false, cancelled_summary(&report.stats))
        } else {
            transition(&mut report.state, RunState::Completed);
            (true, completed_summary(&report.stats))
        };
        tracing::info!("{} in {:.1}s", summary, report.stats.total_seconds);
        emit(events, completion(ok, summary, report.stats.clone())).await;
        report
    }

    fn write_reports(&self, report: &RunReport) -> Result<(), PipelineError> {
        let Some(layout) = &report.layout else {
            return Ok(());
        };
        ReportWriter::write_metadata(&layout.metadata_report(), &report.metadata)?;
        if !report.failures.is_empty() {
            ReportWriter::write_failures(&layout.failure_report(), &report.failures)?;
        }
        Ok(())
    }

    async fn abort(
        &self,
        state: RunState,
        error: &PipelineError,
        stats: ProcessingStats,
        events: &mpsc::Sender<PipelineEvent>,
    ) -> RunReport {
        tracing::error!("{}", error);
        emit(events, completion(false, error.to_string(), stats.clone())).await;
        RunReport {
            stats,
            ..RunReport::early_exit(state)
        }
    }
}

fn transition(state: &mut RunState, next: RunState) {
    tracing::debug!("Run state {:?} -> {:?}", state, next);
    *state = next;
}

/// `floor(index * 100 / total)` for a zero-based index.
fn percent_complete(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (index * 100 / total).min(100) as u8
}

fn completed_summary(stats: &ProcessingStats) -> String {
    let mut summary = format!(
        "Successfully processed {} of {} images",
        stats.succeeded, stats.total
    );
    if stats.failed > 0 {
        summary.push_str(&format!(" ({} failed, see {FAILURE_REPORT})", stats.failed));
    }
    summary
}

fn cancelled_summary(stats: &ProcessingStats) -> String {
    format!(
        "Cancelled after {} of {} images ({} succeeded, {} failed)",
        stats.processed(),
        stats.total,
        stats.succeeded,
        stats.failed
    )
}

fn completion(ok: bool, summary: String, stats: ProcessingStats) -> PipelineEvent {
    PipelineEvent::Completed(CompletionEvent { ok, summary, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use crate::pipeline::fetch::tests::{http_response, serve_once};
    use crate::pipeline::fixtures::{plain_jpeg, FakeFetcher};
    use crate::report::FAILURE_BANNER;

    struct Workspace {
        _dir: tempfile::TempDir,
        input: PathBuf,
        output: PathBuf,
    }

    fn workspace(table: &str) -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("salon.csv");
        std::fs::write(&input, table).unwrap();
        let output = dir.path().join("out").join("salon");
        Workspace {
            _dir: dir,
            input,
            output,
        }
    }

    async fn run_collect(
        pipeline: &BatchPipeline,
        ws: &Workspace,
    ) -> (RunReport, Vec<PipelineEvent>) {
        // Large enough that the run never waits on the consumer
        let (tx, mut rx) = mpsc::channel(256);
        let report = pipeline.run(&ws.input, &ws.output, &tx).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (report, events)
    }

    fn completion_of(events: &[PipelineEvent]) -> &CompletionEvent {
        match events.last() {
            Some(PipelineEvent::Completed(c)) => c,
            other => panic!("Expected completion last, got {other:?}"),
        }
    }

    fn progress(events: &[PipelineEvent]) -> Vec<&ProgressEvent> {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress(p) => Some(p),
                PipelineEvent::Completed(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_http_failure_in_three() {
        let ws = workspace(
            "File Name,Image: URL\n\
             1-Kea.jpg,http://x/1\n\
             2-Tui.jpg,http://x/2\n\
             3-Ruru.jpg,http://x/3\n",
        );
        let fetcher = FakeFetcher::default()
            .image("http://x/1", plain_jpeg(40, 30))
            .error("http://x/2", RecordError::HttpStatus(500))
            .image("http://x/3", plain_jpeg(30, 40));
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(fetcher));

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.stats.succeeded, 2);
        assert_eq!(report.stats.failed, 1);

        let metadata = std::fs::read_to_string(ws.output.join("image_metadata.csv")).unwrap();
        let rows: Vec<&str> = metadata.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("1-Kea.jpg,"));
        assert!(rows[1].starts_with("3-Ruru.jpg,"));

        let errors = std::fs::read_to_string(ws.output.join("processing_errors.txt")).unwrap();
        let lines: Vec<&str> = errors.lines().collect();
        assert_eq!(lines, vec![FAILURE_BANNER, "2-Tui.jpg: HTTP error: status code 500"]);

        let done = completion_of(&events);
        assert!(done.ok);
        assert_eq!(
            done.summary,
            "Successfully processed 2 of 3 images (1 failed, see processing_errors.txt)"
        );

        let per_record: Vec<_> = progress(&events)
            .into_iter()
            .filter(|p| p.severity != Severity::Info)
            .collect();
        assert_eq!(
            per_record.iter().map(|p| p.percent).collect::<Vec<_>>(),
            vec![0, 33, 66]
        );
        assert_eq!(per_record[0].message, "Processed 1/3: 1-Kea.jpg (40x30, original size)");
        assert_eq!(per_record[1].severity, Severity::Failure);
        assert_eq!(
            per_record[1].message,
            "Failed 2/3: 2-Tui.jpg: HTTP error: status code 500"
        );
    }

    #[tokio::test]
    async fn test_http_end_to_end() {
        let ok_a = serve_once(http_response("200 OK", Some("image/jpeg"), &plain_jpeg(16, 16))).await;
        let broken = serve_once(http_response("500 Internal Server Error", None, b"")).await;
        let ok_b = serve_once(http_response("200 OK", Some("image/jpeg"), &plain_jpeg(8, 8))).await;
        let ws = workspace(&format!(
            "File Name,Image: URL\na.jpg,{ok_a}\nb.jpg,{broken}\nc.jpg,{ok_b}\n"
        ));
        let pipeline = BatchPipeline::new(Config::default()).unwrap();

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert_eq!(report.stats.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].original_file_name, "b.jpg");
        assert!(report.failures[0].error_message.starts_with("HTTP error"));
        assert!(completion_of(&events).summary.contains("2 of 3"));
    }

    #[tokio::test]
    async fn test_rejected_table_creates_nothing() {
        let ws = workspace("Name,URL\na.jpg,http://x/a\n");
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(FakeFetcher::default()));

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert_eq!(report.state, RunState::Rejected);
        assert!(!ws.output.exists());
        assert_eq!(events.len(), 1);
        let done = completion_of(&events);
        assert!(!done.ok);
        assert_eq!(
            done.summary,
            "CSV file missing required columns: 'File Name' and 'Image: URL'"
        );
    }

    #[tokio::test]
    async fn test_no_failure_report_when_all_succeed() {
        let ws = workspace("File Name,Image: URL\na.jpg,http://x/a\n");
        let fetcher = FakeFetcher::default().image("http://x/a", plain_jpeg(8, 8));
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(fetcher));

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert!(report.is_ok());
        assert!(ws.output.join("image_metadata.csv").is_file());
        assert!(!ws.output.join("processing_errors.txt").exists());
        assert_eq!(
            completion_of(&events).summary,
            "Successfully processed 1 of 1 images"
        );
    }

    #[tokio::test]
    async fn test_empty_table_writes_header_only() {
        let ws = workspace("File Name,Image: URL\n");
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(FakeFetcher::default()));

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert!(report.is_ok());
        let metadata = std::fs::read_to_string(ws.output.join("image_metadata.csv")).unwrap();
        assert_eq!(metadata.lines().count(), 1);
        assert_eq!(
            completion_of(&events).summary,
            "Successfully processed 0 of 0 images"
        );
    }

    #[tokio::test]
    async fn test_sequencing_across_batch() {
        let ws = workspace(
            "File Name,Image: URL\n\
             123-Sunset.jpg,http://x/1\n\
             9-Other.jpg,http://x/2\n\
             123-Dawn.jpg,http://x/3\n",
        );
        let fetcher = FakeFetcher::default()
            .image("http://x/1", plain_jpeg(8, 8))
            .image("http://x/2", plain_jpeg(8, 8))
            .image("http://x/3", plain_jpeg(8, 8));
        let mut config = Config::default();
        config.processing.add_sequence_numbers = true;
        config.processing.limit_full_size = false;
        config.processing.remove_metadata = false;
        let pipeline = BatchPipeline::with_fetcher(config, Arc::new(fetcher));

        let (report, _) = run_collect(&pipeline, &ws).await;

        let names: Vec<&str> = report.metadata.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(names, vec!["123-1 Sunset.jpg", "9-1 Other.jpg", "123-2 Dawn.jpg"]);
        assert!(ws.output.join("submitted-size").join("123-2 Dawn.jpg").is_file());
        assert!(ws.output.join("thumbnails").join("123-2 Dawn.jpg").is_file());
    }

    #[tokio::test]
    async fn test_panic_in_one_record_does_not_end_run() {
        let ws = workspace(
            "File Name,Image: URL\n\
             1-Kea.jpg,http://x/1\n\
             2-Tui.jpg,http://x/2\n",
        );
        let fetcher = FakeFetcher::default()
            .panic_on("http://x/1")
            .error("http://x/2", RecordError::HttpStatus(404));
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(fetcher));

        let mut stream = pipeline.start(ws.input.clone(), ws.output.clone());
        let mut events = Vec::new();
        while let Some(event) = stream.recv().await {
            events.push(event);
        }
        let report = stream.finish().await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.stats.failed, 2);
        assert!(report.failures[0]
            .error_message
            .starts_with("Unexpected error: "));
        assert_eq!(
            report.failures[1].error_message,
            "HTTP error: status code 404"
        );

        let completions = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Completed(_)))
            .count();
        assert_eq!(completions, 1);
        assert!(ws.output.join("image_metadata.csv").is_file());
        let errors = std::fs::read_to_string(ws.output.join("processing_errors.txt")).unwrap();
        assert_eq!(errors.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_unwritable_output_root_fails_run() {
        let ws = workspace("File Name,Image: URL\na.jpg,http://x/a\n");
        // A file where the run folder should go
        std::fs::create_dir_all(ws.output.parent().unwrap()).unwrap();
        std::fs::write(&ws.output, b"occupied").unwrap();
        let fetcher = FakeFetcher::default().image("http://x/a", plain_jpeg(8, 8));
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(fetcher));

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.stats.total, 1);
        assert_eq!(report.stats.processed(), 0);
        assert!(report.layout.is_none());
        assert_eq!(events.len(), 1);
        let done = completion_of(&events);
        assert!(!done.ok);
        assert!(done.summary.starts_with("Cannot create output directory"));
    }

    #[tokio::test]
    async fn test_report_write_failure_fails_run() {
        let ws = workspace("File Name,Image: URL\na.jpg,http://x/a\n");
        // A directory squatting on the metadata report path
        std::fs::create_dir_all(ws.output.join("image_metadata.csv")).unwrap();
        let fetcher = FakeFetcher::default().image("http://x/a", plain_jpeg(8, 8));
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(fetcher));

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.stats.succeeded, 1);
        let done = completion_of(&events);
        assert!(!done.ok);
        assert!(done.summary.starts_with("Cannot write report"));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, PipelineEvent::Completed(_)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_still_reports() {
        let ws = workspace(
            "File Name,Image: URL\n\
             a.jpg,http://x/a\n\
             b.jpg,http://x/b\n",
        );
        let fetcher = FakeFetcher::default()
            .image("http://x/a", plain_jpeg(8, 8))
            .image("http://x/b", plain_jpeg(8, 8));
        let pipeline = BatchPipeline::with_fetcher(Config::default(), Arc::new(fetcher));
        pipeline.cancellation().cancel();

        let (report, events) = run_collect(&pipeline, &ws).await;

        assert_eq!(report.state, RunState::Cancelled);
        assert_eq!(report.stats.processed(), 0);
        assert!(ws.output.join("image_metadata.csv").is_file());
        let done = completion_of(&events);
        assert!(!done.ok);
        assert!(done.summary.starts_with("Cancelled after 0 of 2 images"));
    }

    #[tokio::test]
    async fn test_start_streams_until_completion() {
        let ws = workspace("File Name,Image: URL\na.jpg,http://x/a\nb.jpg,http://x/missing\n");
        let fetcher = FakeFetcher::default().image("http://x/a", plain_jpeg(8, 8));
        let mut config = Config::default();
        config.pipeline.event_buffer = 1;
        let pipeline = BatchPipeline::with_fetcher(config, Arc::new(fetcher));

        let mut stream = pipeline.start(ws.input.clone(), ws.output.clone());
        let mut events = Vec::new();
        while let Some(event) = stream.recv().await {
            events.push(event);
        }
        let report = stream.finish().await.unwrap();

        let completions = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Completed(_)))
            .count();
        assert_eq!(completions, 1);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(
            report.failures[0].error_message,
            "Network error: connection refused"
        );
    }

    #[test]
    fn test_percent_complete() {
        assert_eq!(percent_complete(0, 3), 0);
        assert_eq!(percent_complete(2, 3), 66);
        assert_eq!(percent_complete(0, 0), 100);
    }
}
