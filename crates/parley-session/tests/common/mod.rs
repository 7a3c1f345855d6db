//! Test doubles for the translation and synthesis collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_session::{BoxFuture, SessionError, SpeechSink, Translator};
use parley_types::{Direction, TranslationPair};

/// A synthesizer that records every accepted push.
pub struct RecordingSink {
    pushes: Mutex<Vec<(String, bool)>>,
    delay: Duration,
    fail_next: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Each push takes `delay` before completing, so tests can preempt
    /// fragments while they are in flight.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            pushes: Mutex::new(Vec::new()),
            delay,
            fail_next: AtomicUsize::new(0),
        }
    }

    /// Makes the next `n` pushes fail with `SynthesisUnavailable`.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<(String, bool)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn spoken_text(&self) -> String {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SpeechSink for RecordingSink {
    fn push_speech<'a>(
        &'a self,
        text: &'a str,
        interruptible: bool,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(SessionError::SynthesisUnavailable("injected failure".into()));
            }
            self.pushes
                .lock()
                .unwrap()
                .push((text.to_string(), interruptible));
            Ok(())
        })
    }
}

/// A translator that answers from a scripted source-to-translation map
/// and records every request it receives.
pub struct ScriptedTranslator {
    replies: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, Option<TranslationPair>)>>,
    fail_next: AtomicUsize,
    delay: Mutex<Duration>,
}

impl ScriptedTranslator {
    pub fn new(replies: &[(&str, &str)]) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|(s, t)| (s.to_string(), t.to_string()))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
            fail_next: AtomicUsize::new(0),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Each subsequent request takes `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Makes the next `n` requests fail with `TranslationUnavailable`.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Option<TranslationPair>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Translator for ScriptedTranslator {
    fn request_translation<'a>(
        &'a self,
        source_text: &'a str,
        context: Option<&'a TranslationPair>,
        _direction: &'a Direction,
    ) -> BoxFuture<'a, Result<String, SessionError>> {
        self.calls
            .lock()
            .unwrap()
            .push((source_text.to_string(), context.cloned()));
        let delay = *self.delay.lock().unwrap();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(SessionError::TranslationUnavailable("injected timeout".into()));
            }
            self.replies
                .lock()
                .unwrap()
                .get(source_text)
                .cloned()
                .ok_or_else(|| {
                    SessionError::TranslationUnavailable(format!(
                        "no scripted reply for {source_text:?}"
                    ))
                })
        })
    }
}

/// Polls `cond` for up to two seconds.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

/// Collects every emitted signal into a shared vector.
pub fn collect_signals(
    emitter: &parley_observe::Emitter,
) -> Arc<Mutex<Vec<parley_observe::Signal>>> {
    let signals = Arc::new(Mutex::new(Vec::new()));
    let mut rx = emitter.subscribe();
    let collected = Arc::clone(&signals);
    tokio::spawn(async move {
        while let Ok(signal) = rx.recv().await {
            collected.lock().unwrap().push(signal);
        }
    });
    signals
}

/// Event type strings observed so far.
pub fn event_types(signals: &Arc<Mutex<Vec<parley_observe::Signal>>>) -> Vec<&'static str> {
    signals
        .lock()
        .unwrap()
        .iter()
        .filter_map(|s| match s {
            parley_observe::Signal::Event { event, .. } => Some(event.event_type()),
            parley_observe::Signal::Metric { .. } => None,
        })
        .collect()
}
