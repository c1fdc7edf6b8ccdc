//! Destinations for tracked telemetry.
//!
//! [`TelemetrySink::emit`] is called while the recorder is locked, so
//! implementations must not block. Anything slow (network delivery) is
//! handed off through a channel to a background task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::delivery::TelemetryDelivery;
use crate::telemetry::TelemetryRecord;

pub trait TelemetrySink: Send + Sync {
    /// Accept one record. Emission is fire-and-forget.
    fn emit(&self, record: &TelemetryRecord);
}

// ---------------------------------------------------------------------------
// TracingSink
// ---------------------------------------------------------------------------

/// Writes each record as a structured `info` log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, record: &TelemetryRecord) {
        let event = &record.event;
        tracing::info!(
            session_id = %record.session_id,
            kind = ?event.kind,
            field = event.field.map(|f| f.as_str()),
            step = event.step,
            duration_ms = event.duration_ms,
            error = event.error.as_deref(),
            "Form analytics event"
        );
    }
}

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

/// Forwards records to an in-process receiver.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TelemetryRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TelemetryRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TelemetrySink for ChannelSink {
    fn emit(&self, record: &TelemetryRecord) {
        // A closed receiver just means nobody is listening any more.
        let _ = self.tx.send(record.clone());
    }
}

// ---------------------------------------------------------------------------
// WebhookSink
// ---------------------------------------------------------------------------

/// Queues records for HTTP delivery by a background [`TelemetryDelivery`].
#[derive(Debug, Clone)]
pub struct WebhookSink {
    tx: mpsc::UnboundedSender<TelemetryRecord>,
}

impl WebhookSink {
    /// Start the delivery task. It exits once every clone of the sink has
    /// been dropped and the queue is drained.
    pub fn spawn(delivery: TelemetryDelivery) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(delivery.run(rx));
        (Self { tx }, handle)
    }
}

impl TelemetrySink for WebhookSink {
    fn emit(&self, record: &TelemetryRecord) {
        if self.tx.send(record.clone()).is_err() {
            tracing::warn!(
                session_id = %record.session_id,
                "Telemetry delivery task has stopped, dropping event"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::AnalyticsEvent;
    use onboard_core::FieldId;
    use uuid::Uuid;

    fn record() -> TelemetryRecord {
        TelemetryRecord {
            session_id: Uuid::now_v7(),
            event: AnalyticsEvent::field_focus(FieldId::CompanyName),
        }
    }

    #[test]
    fn channel_sink_forwards_records() {
        let (sink, mut rx) = ChannelSink::new();
        let record = record();
        sink.emit(&record);
        assert_eq!(rx.try_recv().unwrap(), record);
    }

    #[test]
    fn channel_sink_tolerates_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(&record());
    }

    #[test]
    fn tracing_sink_does_not_panic() {
        TracingSink.emit(&record());
    }
}
