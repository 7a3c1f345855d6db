//! Stable-prefix detection over a revising transcript stream.
//!
//! The recognizer replaces the whole transcript on every revision, so no
//! single transcript can be trusted until its words stop moving. A word
//! is considered stable once it appears at the same position in the last
//! `window` transcripts; the stable prefix is the longest run of such
//! words from the start, clipped by a configurable trailing guard.

use std::collections::VecDeque;

use parley_types::words;

/// Result of observing one transcript revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableOutcome {
    /// Not enough history yet; the stable prefix is empty.
    Pending,
    /// The confirmed stable prefix, in words. Non-decreasing within one
    /// utterance.
    Stable(usize),
    /// The transcript shrank below the already-confirmed prefix. The
    /// recognizer has desynchronized; the caller must treat this as an
    /// utterance boundary, not a shrink.
    Desync,
}

/// Tracks the longest prefix of the current utterance that is unlikely
/// to change further.
///
/// Synchronous and allocation-light; O(words) per observation.
#[derive(Debug)]
pub struct StableWindowTracker {
    window: usize,
    guard_tokens: usize,
    history: VecDeque<String>,
    confirmed: usize,
}

impl StableWindowTracker {
    /// Creates a tracker requiring agreement across `window` consecutive
    /// transcripts (minimum 2), with `guard_tokens` trailing words held
    /// back from the stable prefix.
    pub fn new(window: usize, guard_tokens: usize) -> Self {
        Self {
            window: window.max(2),
            guard_tokens,
            history: VecDeque::new(),
            confirmed: 0,
        }
    }

    /// Observes one transcript revision and returns the updated stable
    /// prefix length.
    pub fn observe(&mut self, text: &str) -> StableOutcome {
        let new_len = words(text).count();
        if new_len < self.confirmed {
            return StableOutcome::Desync;
        }

        self.history.push_back(text.to_string());
        while self.history.len() > self.window {
            self.history.pop_front();
        }

        if self.history.len() < self.window {
            return StableOutcome::Pending;
        }

        let candidate = self.agreed_prefix_len();
        self.confirmed = self.confirmed.max(candidate);
        StableOutcome::Stable(self.confirmed)
    }

    /// Longest word-prefix on which every transcript in the window
    /// agrees, clipped to the second-to-last transcript's length minus
    /// the trailing guard.
    fn agreed_prefix_len(&self) -> usize {
        let latest = self.history.back().expect("window is non-empty");
        let mut agreed = words(latest).count();

        for earlier in self.history.iter().take(self.history.len() - 1) {
            let common = words(earlier)
                .zip(words(latest))
                .take_while(|(a, b)| a == b)
                .count();
            agreed = agreed.min(common);
        }

        let previous = &self.history[self.history.len() - 2];
        let clip = words(previous).count().saturating_sub(self.guard_tokens);
        agreed.min(clip)
    }

    /// The confirmed stable prefix length in words.
    pub fn confirmed(&self) -> usize {
        self.confirmed
    }

    /// Clears all history for a new utterance.
    pub fn reset(&mut self) {
        self.history.clear();
        self.confirmed = 0;
    }
}
