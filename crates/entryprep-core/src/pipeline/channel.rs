//! Bounded event channel between a running batch and its consumer.

use tokio::sync::mpsc;

use crate::config::PipelineConfig;
use crate::types::PipelineEvent;

/// Create a bounded event channel with the configured buffer size.
///
/// When the buffer is full the pipeline waits for the consumer before moving
/// on to the next record, so a slow renderer throttles the run instead of
/// queueing unbounded events.
pub fn bounded_channel(
    config: &PipelineConfig,
) -> (mpsc::Sender<PipelineEvent>, mpsc::Receiver<PipelineEvent>) {
    mpsc::channel(config.event_buffer.max(1))
}

/// Send an event, ignoring a consumer that has gone away.
///
/// Returns false once the receiver is dropped.
pub(crate) async fn emit(tx: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) -> bool {
    if tx.send(event).await.is_err() {
        tracing::debug!("Event consumer dropped, continuing without progress output");
        return false;
    }
    true
}
