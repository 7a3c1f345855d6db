//! Shared types for the Parley translation pipeline.
//!
//! This crate provides the foundational data model used across all Parley
//! crates: languages and translation directions, recognizer transcripts,
//! translation context pairs, and the dispatch requests handed to the
//! speech synthesizer.
//!
//! No crate in the workspace depends on anything *except* `parley-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod text;
pub use text::{first_words, strip_word_prefix, word_count, words};

/// A language the pipeline can recognize or synthesize.
///
/// The two built-in variants cover the directions the pipeline ships with;
/// `Other` carries any additional ISO 639-1 code without requiring a
/// source change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Russian.
    Ru,
    /// English.
    En,
    /// Any other ISO 639-1 code.
    Other(String),
}

impl Language {
    /// Returns the ISO 639-1 code for this language.
    pub fn code(&self) -> &str {
        match self {
            Self::Ru => "ru",
            Self::En => "en",
            Self::Other(code) => code,
        }
    }

    /// Returns the English display name used in translation prompts.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ru => "Russian",
            Self::En => "English",
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ru" => Ok(Self::Ru),
            "en" => Ok(Self::En),
            code if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) => {
                Ok(Self::Other(code.to_string()))
            }
            _ => Err(ParseLanguageError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid language code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid language code: {0}")]
pub struct ParseLanguageError(pub String);

/// A translation direction: which language is spoken and which is produced.
///
/// Parsed from strings like `"ru-en"` (source-target), and serialized in
/// the same form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Direction {
    /// The language the speaker uses.
    pub source: Language,
    /// The language the synthesizer produces.
    pub target: Language,
}

impl Direction {
    pub fn new(source: Language, target: Language) -> Self {
        Self { source, target }
    }

    /// Returns the opposite direction, for toggling mid-conversation.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self {
            source: Language::Ru,
            target: Language::En,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

impl std::str::FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .split_once('-')
            .ok_or_else(|| ParseDirectionError(s.to_string()))?;
        Ok(Self {
            source: source
                .parse()
                .map_err(|_| ParseDirectionError(s.to_string()))?,
            target: target
                .parse()
                .map_err(|_| ParseDirectionError(s.to_string()))?,
        })
    }
}

/// Error returned when parsing an invalid direction string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid direction (expected e.g. \"ru-en\"): {0}")]
pub struct ParseDirectionError(pub String);

impl Serialize for Direction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The recognizer's current best guess for the active utterance.
///
/// Each revision *replaces* the previous transcript rather than appending
/// to it; the revising stream may extend, shorten, or rewrite earlier
/// words until the final transcript arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// The full transcript text as currently recognized.
    pub text: String,
    /// Whether this is the terminal transcript for the utterance.
    pub is_final: bool,
    /// Recognizer language hint, if one was provided.
    pub language: Option<Language>,
}

impl Transcript {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            language: None,
        }
    }

    /// Word count of the transcript (whitespace tokenization).
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}

/// An immutable record of what was translated for a given stable prefix.
///
/// The newest pair is retained as context for the next delta request so
/// the translator extends its previous answer instead of retranslating
/// from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationPair {
    /// The stable source prefix that was translated.
    pub source_text: String,
    /// The translation of the full source prefix.
    pub translated_text: String,
}

impl TranslationPair {
    pub fn new(source_text: impl Into<String>, translated_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            translated_text: translated_text.into(),
        }
    }
}

/// Interruption policy for a dispatched speech fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptPolicy {
    /// May be truncated or discarded if a more authoritative fragment for
    /// the same utterance arrives.
    Interruptible,
    /// Always runs to completion (final and corrective fragments).
    MustComplete,
}

/// A unit of text handed to the speech synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Monotonically increasing sequence number scoped to the utterance.
    pub seq: u64,
    /// The utterance this fragment belongs to.
    pub utterance_id: Uuid,
    /// The text to synthesize.
    pub text: String,
    /// Whether the fragment may be interrupted.
    pub policy: InterruptPolicy,
    /// Marks the mismatch-repair fragment emitted by reconciliation.
    pub corrective: bool,
}

impl DispatchRequest {
    /// An interruptible interim fragment.
    pub fn interim(seq: u64, utterance_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            seq,
            utterance_id,
            text: text.into(),
            policy: InterruptPolicy::Interruptible,
            corrective: false,
        }
    }

    /// A non-interruptible completion fragment.
    pub fn completion(seq: u64, utterance_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            seq,
            utterance_id,
            text: text.into(),
            policy: InterruptPolicy::MustComplete,
            corrective: false,
        }
    }

    /// Word count of the fragment text.
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}
