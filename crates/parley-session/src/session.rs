//! Per-utterance session state machine.
//!
//! One session bridges one recognizer stream to one synthesizer stream.
//! All session state is owned by a single task that processes events
//! strictly sequentially; the only overlap is with the session's own
//! asynchronous sub-calls (the translation request and the synthesizer
//! push), whose results re-enter the loop as events. That discipline is
//! what makes the stale-response guard correct without any locking.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_observe::{Emitter, Metric, MetricsSummary, PipelineEvent};
use parley_types::{
    first_words, word_count, words, Direction, DispatchRequest, Language, TranslationPair,
    Transcript,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::DeltaCache;
use crate::config::SessionConfig;
use crate::dispatch::{DispatchStats, DispatcherHandle, SpeechDispatcher, SpeechSink};
use crate::error::SessionError;
use crate::reconcile::reconcile;
use crate::stable::{StableOutcome, StableWindowTracker};
use crate::translate::{DeltaOutcome, DeltaTranslator, Translator};

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// No active utterance.
    Idle,
    /// Interim transcripts are being accumulated and spoken.
    Accumulating,
    /// The final transcript arrived; reconciliation is in progress.
    Finalizing,
}

/// State owned for the single active utterance.
struct UtteranceState {
    utterance_id: Uuid,
    transcript: Transcript,
    /// Confirmed stable prefix length in words.
    stable_words: usize,
    /// Append-only log of accepted translation pairs.
    pairs: Vec<TranslationPair>,
    /// Every word handed to the dispatcher, in dispatch order.
    sent_words: Vec<String>,
    interim_count: usize,
    started_at: Instant,
    next_seq: u64,
}

impl UtteranceState {
    fn new() -> Self {
        Self {
            utterance_id: Uuid::new_v4(),
            transcript: Transcript::interim(""),
            stable_words: 0,
            pairs: Vec::new(),
            sent_words: Vec::new(),
            interim_count: 0,
            started_at: Instant::now(),
            next_seq: 0,
        }
    }
}

/// Events processed by the session loop.
enum SessionEvent {
    Interim {
        text: String,
        language: Option<Language>,
    },
    Final {
        text: String,
        authoritative: String,
    },
    SilenceTimeout,
    Reset {
        direction: Option<Direction>,
    },
    /// A spawned translation call finished. Carries the source prefix it
    /// was issued for so stale results can be recognized and discarded.
    TranslationDone {
        utterance_id: Uuid,
        requested_source: String,
        latency_ms: u64,
        outcome: Result<DeltaOutcome, SessionError>,
    },
}

/// Clonable handle for feeding recognizer events into a session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
    dispatcher: DispatcherHandle,
}

impl SessionHandle {
    /// Feeds one interim (revising) transcript.
    pub fn interim_transcript(
        &self,
        text: impl Into<String>,
        language: Option<Language>,
    ) -> Result<(), SessionError> {
        self.tx
            .send(SessionEvent::Interim {
                text: text.into(),
                language,
            })
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Feeds the terminal transcript together with its authoritative
    /// translation.
    pub fn final_transcript(
        &self,
        text: impl Into<String>,
        authoritative_translation: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.tx
            .send(SessionEvent::Final {
                text: text.into(),
                authoritative: authoritative_translation.into(),
            })
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Forces an utterance boundary without a final translation.
    pub fn silence_timeout(&self) -> Result<(), SessionError> {
        self.tx
            .send(SessionEvent::SilenceTimeout)
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Resets the session, optionally switching direction.
    pub fn reset(&self, direction: Option<Direction>) -> Result<(), SessionError> {
        self.tx
            .send(SessionEvent::Reset { direction })
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Snapshot of the dispatcher's per-utterance accounting.
    pub async fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats().await
    }
}

/// The session worker. Created via [`UtteranceSession::spawn`].
pub struct UtteranceSession {
    config: SessionConfig,
    direction: Direction,
    state: SessionState,
    utterance: Option<UtteranceState>,
    tracker: StableWindowTracker,
    cache: DeltaCache,
    translator: DeltaTranslator,
    dispatcher: DispatcherHandle,
    emitter: Emitter,
    metrics: MetricsSummary,
    translation_in_flight: bool,
    self_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl UtteranceSession {
    /// Spawns the session task and its dispatcher worker.
    pub fn spawn(
        config: SessionConfig,
        translator: Arc<dyn Translator>,
        sink: Arc<dyn SpeechSink>,
        emitter: Emitter,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = SpeechDispatcher::spawn(sink, emitter.clone());

        let session = Self {
            direction: config.direction.clone(),
            tracker: StableWindowTracker::new(
                config.stability_window,
                config.stability_guard_tokens,
            ),
            config,
            state: SessionState::Idle,
            utterance: None,
            cache: DeltaCache::new(),
            translator: DeltaTranslator::new(translator),
            dispatcher: dispatcher.clone(),
            emitter,
            metrics: MetricsSummary::new(),
            translation_in_flight: false,
            self_tx: tx.clone(),
        };
        tokio::spawn(session.run(rx));

        SessionHandle { tx, dispatcher }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        loop {
            let event = if self.state == SessionState::Accumulating {
                let silence = Duration::from_millis(self.config.silence_reset_ms);
                match tokio::time::timeout(silence, rx.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(_) => SessionEvent::SilenceTimeout,
                }
            } else {
                match rx.recv().await {
                    Some(event) => event,
                    None => break,
                }
            };
            self.handle(event).await;
        }
        debug!("session loop exited");
    }

    async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Interim { text, language } => {
                self.handle_interim(text, language);
            }
            SessionEvent::Final {
                text,
                authoritative,
            } => {
                self.handle_final(text, authoritative).await;
            }
            SessionEvent::SilenceTimeout => {
                if self.utterance.is_some() {
                    debug!("silence timeout, forcing utterance boundary");
                    self.boundary(true);
                }
            }
            SessionEvent::Reset { direction } => {
                self.dispatcher.reset();
                self.boundary(false);
                if let Some(direction) = direction {
                    info!(%direction, "session direction changed");
                    self.direction = direction;
                }
            }
            SessionEvent::TranslationDone {
                utterance_id,
                requested_source,
                latency_ms,
                outcome,
            } => {
                self.handle_translation_done(utterance_id, requested_source, latency_ms, outcome);
            }
        }
    }

    fn handle_interim(&mut self, text: String, language: Option<Language>) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.apply_language_hint(language.as_ref());

        if self.utterance.is_none() {
            self.begin_utterance();
        }
        let utterance = self.utterance.as_mut().expect("utterance exists");
        utterance.interim_count += 1;
        utterance.transcript = Transcript {
            text: text.clone(),
            is_final: false,
            language,
        };

        match self.tracker.observe(&text) {
            StableOutcome::Pending => {}
            StableOutcome::Stable(n) => {
                let utterance = self.utterance.as_mut().expect("utterance exists");
                utterance.stable_words = n;
                self.maybe_translate();
            }
            StableOutcome::Desync => {
                let utterance = self.utterance.as_ref().expect("utterance exists");
                self.emitter.event(PipelineEvent::DesyncDetected {
                    utterance_id: utterance.utterance_id,
                    confirmed_words: self.tracker.confirmed(),
                    new_words: word_count(&text),
                });
                self.boundary(true);
                // The shrunken transcript opens the next utterance.
                self.begin_utterance();
                let utterance = self.utterance.as_mut().expect("utterance exists");
                utterance.interim_count = 1;
                utterance.transcript = Transcript::interim(text.clone());
                self.tracker.observe(&text);
            }
        }
    }

    async fn handle_final(&mut self, text: String, authoritative: String) {
        if self.utterance.is_none() {
            // Utterance too short to produce interims; reconciliation
            // still speaks the authoritative translation.
            self.begin_utterance();
        }
        self.state = SessionState::Finalizing;

        let utterance = self.utterance.as_mut().expect("utterance exists");
        utterance.transcript = Transcript {
            text: text.clone(),
            is_final: true,
            language: None,
        };
        let utterance_id = utterance.utterance_id;
        let next_seq = utterance.next_seq;
        debug!(%utterance_id, final_text = %text, "final transcript");

        // Trailing interim speech yields to the authoritative completion.
        self.dispatcher.preempt(utterance_id);
        if self.dispatcher.sync().await.is_err() {
            warn!("dispatcher gone during finalization");
        }

        let stats = self.dispatcher.stats().await;
        let utterance = self.utterance.as_ref().expect("utterance exists");
        let spoken = utterance
            .sent_words
            .iter()
            .take(stats.spoken_word_count)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");

        let outcome = reconcile(&spoken, &authoritative, utterance_id, next_seq);
        if outcome.mismatch {
            self.emitter.event(PipelineEvent::MismatchDetected {
                utterance_id,
                spoken: spoken.clone(),
                authoritative: authoritative.clone(),
            });
        }
        if let Some(request) = outcome.request {
            if self.dispatcher.dispatch(request).is_err() {
                warn!("dispatcher gone, dropping completion fragment");
            }
        }

        self.emitter.event(PipelineEvent::UtteranceCompleted {
            utterance_id,
            interim_count: utterance.interim_count,
            spoken_words: stats.spoken_word_count,
        });
        info!(%utterance_id, metrics = %self.metrics.summary(), "utterance completed");

        self.boundary(false);
    }

    fn handle_translation_done(
        &mut self,
        utterance_id: Uuid,
        requested_source: String,
        latency_ms: u64,
        outcome: Result<DeltaOutcome, SessionError>,
    ) {
        self.translation_in_flight = false;
        self.emitter
            .metric(utterance_id, Metric::TranslationLatencyMs(latency_ms));
        self.metrics.record(Metric::TranslationLatencyMs(latency_ms));

        let current = match &self.utterance {
            Some(u) if self.state == SessionState::Accumulating => u,
            _ => {
                debug!(%utterance_id, "translation result after utterance ended, discarding");
                return;
            }
        };
        if current.utterance_id != utterance_id {
            debug!(%utterance_id, "translation result for a previous utterance, discarding");
            // The new utterance may already have a stable prefix waiting.
            self.maybe_translate();
            return;
        }

        let stable_text = first_words(&current.transcript.text, current.stable_words);
        if stable_text != requested_source {
            debug!(
                requested = %requested_source,
                current = %stable_text,
                "stale translation result, discarding"
            );
            self.maybe_translate();
            return;
        }

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                // Skip this cycle; the next stable-prefix growth retries.
                self.emitter.event(PipelineEvent::TranslationUnavailable {
                    utterance_id,
                    source_text: requested_source,
                    reason: e.to_string(),
                });
                return;
            }
        };

        if outcome.delta.is_empty() {
            return;
        }
        if word_count(&outcome.delta) < self.config.min_words_before_dispatch {
            debug!(delta = %outcome.delta, "delta below dispatch threshold, waiting for more words");
            return;
        }

        if outcome.drifted {
            let previous_translation = self
                .cache
                .latest()
                .map(|p| p.translated_text.clone())
                .unwrap_or_default();
            self.emitter.event(PipelineEvent::MismatchDetected {
                utterance_id,
                spoken: previous_translation,
                authoritative: outcome.full_translation.clone(),
            });
        }

        let pair = TranslationPair::new(requested_source, outcome.full_translation.clone());
        self.cache.put(pair.clone());

        let utterance = self.utterance.as_mut().expect("utterance exists");
        utterance.pairs.push(pair);
        let seq = utterance.next_seq;
        utterance.next_seq += 1;
        utterance
            .sent_words
            .extend(words(&outcome.delta).map(str::to_string));

        let request = DispatchRequest::interim(seq, utterance_id, outcome.delta);
        if self.dispatcher.dispatch(request).is_err() {
            warn!("dispatcher gone, dropping interim fragment");
        }
    }

    /// Issues a delta translation for the current stable prefix if it has
    /// grown enough, keeping at most one request in flight. A request is
    /// only started once the prefix gained `min_words_before_dispatch`
    /// source words beyond the last translated prefix.
    fn maybe_translate(&mut self) {
        if self.translation_in_flight || self.state != SessionState::Accumulating {
            return;
        }
        let Some(utterance) = &self.utterance else {
            return;
        };

        let stable_text = first_words(&utterance.transcript.text, utterance.stable_words);
        if stable_text.is_empty() {
            return;
        }

        let previous = self.cache.latest().cloned();
        let translated_source_words = previous
            .as_ref()
            .map(|p| word_count(&p.source_text))
            .unwrap_or(0);
        if utterance.stable_words < translated_source_words + self.config.min_words_before_dispatch
        {
            return;
        }
        if previous
            .as_ref()
            .is_some_and(|p| p.source_text == stable_text)
        {
            return;
        }

        let utterance_id = utterance.utterance_id;

        if let Some(cached) = self.cache.get(&stable_text).cloned() {
            // Translated earlier in this utterance; no network call.
            let outcome = cached_outcome(previous.as_ref(), &cached);
            self.translation_in_flight = true;
            let _ = self.self_tx.send(SessionEvent::TranslationDone {
                utterance_id,
                requested_source: stable_text,
                latency_ms: 0,
                outcome: Ok(outcome),
            });
            return;
        }

        self.translation_in_flight = true;
        let translator = self.translator.clone();
        let direction = self.direction.clone();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = translator
                .translate_delta(&stable_text, previous.as_ref(), &direction)
                .await;
            let _ = tx.send(SessionEvent::TranslationDone {
                utterance_id,
                requested_source: stable_text,
                latency_ms: started.elapsed().as_millis() as u64,
                outcome,
            });
        });
    }

    fn begin_utterance(&mut self) {
        let utterance = UtteranceState::new();
        debug!(utterance_id = %utterance.utterance_id, "utterance started");
        self.dispatcher
            .begin_utterance(utterance.utterance_id, utterance.started_at);
        self.utterance = Some(utterance);
        self.state = SessionState::Accumulating;
    }

    /// Ends the active utterance: optionally cancels its pending interim
    /// dispatches, then clears all per-utterance state.
    fn boundary(&mut self, preempt: bool) {
        if preempt {
            if let Some(utterance) = &self.utterance {
                self.dispatcher.preempt(utterance.utterance_id);
            }
        }
        self.utterance = None;
        self.cache.clear();
        self.tracker.reset();
        self.state = SessionState::Idle;
    }

    /// A language hint that flips to the target language toggles the
    /// direction and forces a session reset; an unrelated hint is
    /// ignored with a warning.
    fn apply_language_hint(&mut self, hint: Option<&Language>) {
        let Some(hint) = hint else { return };
        if *hint == self.direction.source {
            return;
        }
        if *hint == self.direction.target {
            info!(hint = %hint, "language hint flipped, toggling direction");
            self.dispatcher.reset();
            self.boundary(false);
            self.direction = self.direction.reversed();
        } else {
            warn!(hint = %hint, direction = %self.direction, "language hint matches neither side, ignoring");
        }
    }
}

/// Builds a delta outcome from a cached pair without a network call.
fn cached_outcome(previous: Option<&TranslationPair>, cached: &TranslationPair) -> DeltaOutcome {
    match previous {
        None => DeltaOutcome {
            delta: cached.translated_text.clone(),
            full_translation: cached.translated_text.clone(),
            drifted: false,
        },
        Some(prev) => {
            match parley_types::strip_word_prefix(&prev.translated_text, &cached.translated_text) {
                Some(suffix) => DeltaOutcome {
                    delta: suffix,
                    full_translation: cached.translated_text.clone(),
                    drifted: false,
                },
                None => DeltaOutcome {
                    delta: cached.translated_text.clone(),
                    full_translation: cached.translated_text.clone(),
                    drifted: true,
                },
            }
        }
    }
}
