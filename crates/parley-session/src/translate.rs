//! Delta translation over an external translation collaborator.
//!
//! The collaborator translates the *full* stable source prefix each time;
//! this module turns that into an incremental stream by supplying the
//! previous (source, translation) pair as context and stripping the
//! previously translated words from the reply.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parley_types::{strip_word_prefix, Direction, TranslationPair};

use crate::error::SessionError;

/// Boxed future alias for object-safe async collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// External translation collaborator.
///
/// One logical in-flight call per session at a time; retries and pooling
/// are the collaborator's concern, not this crate's.
pub trait Translator: Send + Sync {
    /// Translates `source_text` into `direction.target`, optionally
    /// using a previous (source, translation) pair as disambiguating
    /// context so the model extends rather than retranslates.
    fn request_translation<'a>(
        &'a self,
        source_text: &'a str,
        context: Option<&'a TranslationPair>,
        direction: &'a Direction,
    ) -> BoxFuture<'a, Result<String, SessionError>>;
}

/// Result of one incremental translation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaOutcome {
    /// The newly translated words, not yet spoken. Empty when the stable
    /// prefix has not changed.
    pub delta: String,
    /// The translation of the full stable prefix.
    pub full_translation: String,
    /// True when the reply did not extend the previous translation as a
    /// word prefix: word-level assumptions about the previous answer no
    /// longer hold and the whole reply is the delta.
    pub drifted: bool,
}

/// Issues delta translation requests against a [`Translator`].
#[derive(Clone)]
pub struct DeltaTranslator {
    translator: Arc<dyn Translator>,
}

impl DeltaTranslator {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    /// Translates the unseen suffix of `stable_text`.
    ///
    /// If `stable_text` equals the previous pair's source, returns an
    /// empty delta without a network call. Otherwise makes exactly one
    /// request; a failure maps to `TranslationUnavailable` and the caller
    /// retries on its next natural event, never in a loop here.
    pub async fn translate_delta(
        &self,
        stable_text: &str,
        previous: Option<&TranslationPair>,
        direction: &Direction,
    ) -> Result<DeltaOutcome, SessionError> {
        if let Some(prev) = previous {
            if prev.source_text == stable_text {
                return Ok(DeltaOutcome {
                    delta: String::new(),
                    full_translation: prev.translated_text.clone(),
                    drifted: false,
                });
            }
        }

        let full_translation = self
            .translator
            .request_translation(stable_text, previous, direction)
            .await?;

        let (delta, drifted) = match previous {
            None => (full_translation.clone(), false),
            Some(prev) => match strip_word_prefix(&prev.translated_text, &full_translation) {
                Some(suffix) => (suffix, false),
                None => (full_translation.clone(), true),
            },
        };

        Ok(DeltaOutcome {
            delta,
            full_translation,
            drifted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTranslator {
        reply: String,
        calls: AtomicUsize,
    }

    impl ScriptedTranslator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Translator for ScriptedTranslator {
        fn request_translation<'a>(
            &'a self,
            _source_text: &'a str,
            _context: Option<&'a TranslationPair>,
            _direction: &'a Direction,
        ) -> BoxFuture<'a, Result<String, SessionError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(self.reply.clone()) })
        }
    }

    #[tokio::test]
    async fn first_translation_is_the_whole_reply() {
        let inner = Arc::new(ScriptedTranslator::new("Hello how"));
        let delta = DeltaTranslator::new(inner.clone());

        let outcome = delta
            .translate_delta("Привет как", None, &Direction::default())
            .await
            .expect("translate");

        assert_eq!(outcome.delta, "Hello how");
        assert_eq!(outcome.full_translation, "Hello how");
        assert!(!outcome.drifted);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unchanged_prefix_short_circuits_without_a_call() {
        let inner = Arc::new(ScriptedTranslator::new("unused"));
        let delta = DeltaTranslator::new(inner.clone());
        let previous = TranslationPair::new("Привет как", "Hello how");

        let outcome = delta
            .translate_delta("Привет как", Some(&previous), &Direction::default())
            .await
            .expect("translate");

        assert_eq!(outcome.delta, "");
        assert_eq!(outcome.full_translation, "Hello how");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delta_is_stripped_at_word_granularity() {
        let inner = Arc::new(ScriptedTranslator::new("Hello how are you"));
        let delta = DeltaTranslator::new(inner);
        let previous = TranslationPair::new("Привет как", "Hello how");

        let outcome = delta
            .translate_delta(
                "Привет как дела",
                Some(&previous),
                &Direction::default(),
            )
            .await
            .expect("translate");

        assert_eq!(outcome.delta, "are you");
        assert!(!outcome.drifted);
    }

    #[tokio::test]
    async fn non_extending_reply_is_flagged_as_drift() {
        let inner = Arc::new(ScriptedTranslator::new("Good day, how are you"));
        let delta = DeltaTranslator::new(inner);
        let previous = TranslationPair::new("Привет как", "Hello how");

        let outcome = delta
            .translate_delta(
                "Привет как дела",
                Some(&previous),
                &Direction::default(),
            )
            .await
            .expect("translate");

        assert!(outcome.drifted);
        assert_eq!(outcome.delta, "Good day, how are you");
        assert_eq!(outcome.full_translation, "Good day, how are you");
    }

    #[tokio::test]
    async fn collaborator_failure_propagates() {
        struct FailingTranslator;
        impl Translator for FailingTranslator {
            fn request_translation<'a>(
                &'a self,
                _source_text: &'a str,
                _context: Option<&'a TranslationPair>,
                _direction: &'a Direction,
            ) -> BoxFuture<'a, Result<String, SessionError>> {
                Box::pin(async {
                    Err(SessionError::TranslationUnavailable("timeout".to_string()))
                })
            }
        }

        let delta = DeltaTranslator::new(Arc::new(FailingTranslator));
        let result = delta
            .translate_delta("Привет", None, &Direction::default())
            .await;
        assert!(matches!(
            result,
            Err(SessionError::TranslationUnavailable(_))
        ));
    }
}
