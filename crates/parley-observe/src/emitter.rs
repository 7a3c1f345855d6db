//! Broadcast-based signal emission.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::PipelineEvent;
use crate::metric::Metric;

/// Default capacity for the signal broadcast channel.
pub const DEFAULT_SIGNAL_CAPACITY: usize = 256;

/// A timestamped observability signal: either a structured event or a
/// latency metric.
#[derive(Debug, Clone)]
pub enum Signal {
    Event {
        occurred_at: DateTime<Utc>,
        event: PipelineEvent,
    },
    Metric {
        occurred_at: DateTime<Utc>,
        utterance_id: Uuid,
        metric: Metric,
    },
}

/// Clonable handle for emitting pipeline signals.
///
/// Every emit is logged via `tracing` and broadcast to any subscribers;
/// a send with no active receivers is not an error — monitoring is
/// optional, logging is not.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: broadcast::Sender<Signal>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SIGNAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to the signal stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }

    /// Emits a structured pipeline event.
    pub fn event(&self, event: PipelineEvent) {
        if event.is_degradation() {
            warn!(
                event_type = event.event_type(),
                utterance_id = %event.utterance_id(),
                "pipeline event"
            );
        } else {
            info!(
                event_type = event.event_type(),
                utterance_id = %event.utterance_id(),
                "pipeline event"
            );
        }

        let _ = self.tx.send(Signal::Event {
            occurred_at: Utc::now(),
            event,
        });
    }

    /// Emits a latency metric.
    pub fn metric(&self, utterance_id: Uuid, metric: Metric) {
        info!(
            metric = metric.name(),
            value_ms = metric.value_ms(),
            utterance_id = %utterance_id,
            "pipeline metric"
        );

        let _ = self.tx.send(Signal::Metric {
            occurred_at: Utc::now(),
            utterance_id,
            metric,
        });
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
