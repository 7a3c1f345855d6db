//! Structured pipeline event payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quality and failure signals emitted by the pipeline.
///
/// Serialised with a `SCREAMING_SNAKE_CASE` tag so downstream consumers
/// can filter on the `event` field without knowing the full payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineEvent {
    /// Incremental spoken output diverged from the authoritative final
    /// translation. Always resolved by a corrective fragment, never left
    /// unresolved.
    MismatchDetected {
        utterance_id: Uuid,
        /// What was actually spoken before the divergence was detected.
        spoken: String,
        /// The authoritative translation that replaces it.
        authoritative: String,
    },

    /// The recognizer transcript shrank below the already-confirmed stable
    /// prefix, which signals recognizer desynchronization. Forces an
    /// utterance boundary.
    DesyncDetected {
        utterance_id: Uuid,
        /// Word count of the confirmed stable prefix at detection time.
        confirmed_words: usize,
        /// Word count of the transcript that triggered detection.
        new_words: usize,
    },

    /// The translation collaborator failed or timed out for one cycle.
    /// Recovered by skipping the cycle and retrying on the next stable
    /// prefix growth.
    TranslationUnavailable {
        utterance_id: Uuid,
        /// The stable source text the failed request targeted.
        source_text: String,
        reason: String,
    },

    /// A synthesizer push failed. The fragment is dropped rather than
    /// retried, to avoid out-of-order audio.
    SynthesisUnavailable {
        utterance_id: Uuid,
        /// Sequence number of the dropped fragment.
        seq: u64,
        reason: String,
    },

    /// An utterance finished reconciliation and the session reset.
    UtteranceCompleted {
        utterance_id: Uuid,
        /// Number of interim transcripts observed.
        interim_count: usize,
        /// Words successfully pushed to the synthesizer.
        spoken_words: usize,
    },
}

impl PipelineEvent {
    /// Returns the canonical event type string for this payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MismatchDetected { .. } => "MISMATCH_DETECTED",
            Self::DesyncDetected { .. } => "DESYNC_DETECTED",
            Self::TranslationUnavailable { .. } => "TRANSLATION_UNAVAILABLE",
            Self::SynthesisUnavailable { .. } => "SYNTHESIS_UNAVAILABLE",
            Self::UtteranceCompleted { .. } => "UTTERANCE_COMPLETED",
        }
    }

    /// Returns the utterance this event belongs to.
    pub fn utterance_id(&self) -> Uuid {
        match self {
            Self::MismatchDetected { utterance_id, .. }
            | Self::DesyncDetected { utterance_id, .. }
            | Self::TranslationUnavailable { utterance_id, .. }
            | Self::SynthesisUnavailable { utterance_id, .. }
            | Self::UtteranceCompleted { utterance_id, .. } => *utterance_id,
        }
    }

    /// Whether this event indicates a degraded (but recovered) condition.
    pub fn is_degradation(&self) -> bool {
        !matches!(self, Self::UtteranceCompleted { .. })
    }
}
