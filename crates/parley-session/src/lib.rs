//! Incremental translation coordination for the Parley pipeline.
//!
//! Bridges a *revising* recognizer transcript stream and a
//! committed-text speech synthesizer: detects the stable prefix of each
//! utterance as it forms, translates only the newly stabilized words
//! (with the previous translation as context), dispatches fragments to
//! the synthesizer in strict order, and reconciles what was spoken
//! against the authoritative final translation when the utterance ends.
//!
//! The architecture separates concerns: each session owns its state in a
//! single event-loop task, the external translation and synthesis
//! collaborators are reached through object-safe traits, and every
//! quality signal is surfaced through `parley-observe` rather than as a
//! user-visible error.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod openrouter;
pub mod reconcile;
pub mod session;
pub mod stable;
pub mod translate;

pub use cache::DeltaCache;
pub use config::{load_config, ConfigError, SessionConfig, TranslatorConfig};
pub use dispatch::{DispatchStats, DispatcherHandle, SpeechDispatcher, SpeechSink};
pub use error::SessionError;
pub use openrouter::OpenRouterTranslator;
pub use reconcile::{reconcile, Reconciliation};
pub use session::{SessionHandle, UtteranceSession};
pub use stable::{StableOutcome, StableWindowTracker};
pub use translate::{BoxFuture, DeltaOutcome, DeltaTranslator, Translator};
