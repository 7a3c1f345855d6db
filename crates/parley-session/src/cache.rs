//! Per-utterance translation cache.
//!
//! Maps an exact stable source prefix to its previously computed
//! translation. The cache lives exactly as long as one utterance:
//! cross-utterance reuse is not attempted because the acoustic and
//! linguistic context differs, so `clear()` is called at every utterance
//! boundary.

use std::collections::HashMap;

use parley_types::TranslationPair;

/// Exact-text-keyed cache of `(source prefix -> translation)` pairs for
/// the active utterance.
#[derive(Debug, Default)]
pub struct DeltaCache {
    entries: HashMap<String, (u64, TranslationPair)>,
    insert_counter: u64,
}

impl DeltaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the translation for an exact source prefix.
    pub fn get(&self, prefix_text: &str) -> Option<&TranslationPair> {
        self.entries.get(prefix_text).map(|(_, pair)| pair)
    }

    /// Stores a pair, keyed by its source prefix text.
    pub fn put(&mut self, pair: TranslationPair) {
        self.insert_counter += 1;
        self.entries
            .insert(pair.source_text.clone(), (self.insert_counter, pair));
    }

    /// The most recently inserted pair; used as context for the next
    /// delta request.
    pub fn latest(&self) -> Option<&TranslationPair> {
        self.entries
            .values()
            .max_by_key(|(order, _)| *order)
            .map(|(_, pair)| pair)
    }

    /// Drops all entries at an utterance boundary.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.insert_counter = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
