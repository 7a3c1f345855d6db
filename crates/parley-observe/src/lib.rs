//! Observability layer for the Parley translation pipeline.
//!
//! The pipeline never surfaces its internal failures to the end user:
//! translation hiccups show up as elevated latency, synthesis failures as
//! a skipped fragment, and incremental drift as a corrective fragment.
//! What keeps that tolerable in production is this crate — every quality
//! signal and latency measurement is emitted as a structured event that
//! monitoring can subscribe to.
//!
//! # Event kinds
//!
//! | Event | Meaning |
//! |-------|---------|
//! | `MISMATCH_DETECTED` | incremental speech diverged from the authoritative translation |
//! | `DESYNC_DETECTED` | recognizer transcript shrank below the confirmed prefix |
//! | `TRANSLATION_UNAVAILABLE` | translation collaborator failed or timed out |
//! | `SYNTHESIS_UNAVAILABLE` | synthesizer push failed; fragment dropped |
//! | `UTTERANCE_COMPLETED` | utterance reconciled and reset |
//!
//! # Usage
//!
//! ```rust,ignore
//! use parley_observe::{Emitter, Metric};
//!
//! let emitter = Emitter::new();
//! let mut rx = emitter.subscribe();
//! emitter.metric(utterance_id, Metric::TranslationLatencyMs(182));
//! ```

mod emitter;
mod event;
mod metric;

pub use emitter::{Emitter, Signal, DEFAULT_SIGNAL_CAPACITY};
pub use event::PipelineEvent;
pub use metric::{Metric, MetricsSummary};
