//! Reconciliation of spoken output against the authoritative final
//! translation.
//!
//! The incremental path speaks words that a better-informed final pass
//! may contradict. Once the utterance ends, this module compares what was
//! actually spoken with the authoritative translation and produces at
//! most one closing fragment: the unspoken suffix when the incremental
//! path held, or a corrective re-statement when it drifted. It never
//! silently double-speaks — a corrective fragment always comes with a
//! mismatch flag for observability.

use parley_types::{strip_word_prefix, DispatchRequest, InterruptPolicy};
use uuid::Uuid;

/// Outcome of reconciling one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The closing fragment to dispatch, if any. Always must-complete.
    pub request: Option<DispatchRequest>,
    /// True when the spoken words were not a word-prefix of the
    /// authoritative translation.
    pub mismatch: bool,
}

/// Compares `spoken` (the words already pushed to the synthesizer) with
/// the authoritative final translation.
///
/// Three outcomes:
/// - spoken is a word-prefix of the authoritative text: dispatch only the
///   remaining suffix (nothing if it was all spoken already);
/// - spoken diverged: dispatch the full authoritative text as a
///   corrective fragment and flag the mismatch;
/// - nothing was spoken (utterance too short to cross the stability
///   threshold): dispatch the full authoritative text.
pub fn reconcile(
    spoken: &str,
    authoritative: &str,
    utterance_id: Uuid,
    seq: u64,
) -> Reconciliation {
    let authoritative = authoritative.trim();
    if authoritative.is_empty() {
        return Reconciliation {
            request: None,
            mismatch: false,
        };
    }

    if spoken.trim().is_empty() {
        return Reconciliation {
            request: Some(DispatchRequest::completion(seq, utterance_id, authoritative)),
            mismatch: false,
        };
    }

    match strip_word_prefix(spoken, authoritative) {
        Some(remainder) if remainder.is_empty() => Reconciliation {
            request: None,
            mismatch: false,
        },
        Some(remainder) => Reconciliation {
            request: Some(DispatchRequest::completion(seq, utterance_id, remainder)),
            mismatch: false,
        },
        None => Reconciliation {
            request: Some(DispatchRequest {
                seq,
                utterance_id,
                text: authoritative.to_string(),
                policy: InterruptPolicy::MustComplete,
                corrective: true,
            }),
            mismatch: true,
        },
    }
}
