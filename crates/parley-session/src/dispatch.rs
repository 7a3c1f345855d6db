//! Ordered speech dispatch to the synthesizer collaborator.
//!
//! Fragments for one utterance reach the synthesizer in the sequence
//! order they were enqueued, never re-ordered, never duplicated, with at
//! most one push in flight per session. Interruptible fragments may be
//! discarded when a more authoritative fragment arrives; fragments
//! marked must-complete always run to completion.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parley_observe::{Emitter, Metric, PipelineEvent};
use parley_types::{word_count, DispatchRequest, InterruptPolicy};
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::SessionError;
use crate::translate::BoxFuture;

/// External speech synthesis collaborator.
///
/// A push resolves when the synthesizer has accepted (not necessarily
/// finished speaking) the fragment. The synthesizer's own streaming
/// protocol and reconnection are its concern, not this crate's.
pub trait SpeechSink: Send + Sync {
    fn push_speech<'a>(
        &'a self,
        text: &'a str,
        interruptible: bool,
    ) -> BoxFuture<'a, Result<(), SessionError>>;
}

/// Per-utterance dispatch accounting.
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// Words successfully pushed to the synthesizer for the active
    /// utterance. Non-decreasing until the next utterance begins.
    pub spoken_word_count: usize,
    /// Fragments successfully pushed.
    pub pushed_fragments: u64,
    /// Fragments dropped by preemption or synthesis failure.
    pub dropped_fragments: u64,
    /// Interval from utterance start to the first successful push.
    pub time_to_first_audio_ms: Option<u64>,
}

/// Commands accepted by the dispatcher worker.
enum Command {
    /// A new utterance began; resets per-utterance accounting.
    BeginUtterance { utterance_id: Uuid, started_at: Instant },
    Enqueue(DispatchRequest),
    /// Drop all queued interruptible fragments for the utterance. The
    /// in-flight push, if interruptible, is abandoned via the preemption
    /// watch which the handle bumps before sending this command.
    Preempt { utterance_id: Uuid },
    /// Drop everything queued, regardless of policy.
    Reset,
    /// Replies once all previously issued commands have been applied and
    /// no preempted push remains in flight.
    Sync(oneshot::Sender<()>),
}

/// Clonable handle to a running dispatcher worker.
#[derive(Clone)]
pub struct DispatcherHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    preempt_tx: Arc<watch::Sender<u64>>,
    stats: Arc<RwLock<DispatchStats>>,
}

impl DispatcherHandle {
    /// Marks the start of a new utterance for first-audio timing and
    /// word accounting.
    pub fn begin_utterance(&self, utterance_id: Uuid, started_at: Instant) {
        let _ = self.cmd_tx.send(Command::BeginUtterance {
            utterance_id,
            started_at,
        });
    }

    /// Enqueues a fragment for synthesis.
    pub fn dispatch(&self, request: DispatchRequest) -> Result<(), SessionError> {
        self.cmd_tx
            .send(Command::Enqueue(request))
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Cancels queued and in-flight interruptible fragments for the
    /// utterance. Must-complete fragments are unaffected.
    pub fn preempt(&self, utterance_id: Uuid) {
        self.preempt_tx.send_modify(|gen| *gen += 1);
        let _ = self.cmd_tx.send(Command::Preempt { utterance_id });
    }

    /// Drops everything queued; used on session reset.
    pub fn reset(&self) {
        self.preempt_tx.send_modify(|gen| *gen += 1);
        let _ = self.cmd_tx.send(Command::Reset);
    }

    /// Waits until the worker has applied all commands sent so far and
    /// settled any preempted in-flight push.
    pub async fn sync(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Sync(tx))
            .map_err(|_| SessionError::ChannelClosed)?;
        rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Snapshot of the per-utterance dispatch accounting.
    pub async fn stats(&self) -> DispatchStats {
        self.stats.read().await.clone()
    }
}

/// The dispatcher worker. Created via [`SpeechDispatcher::spawn`].
pub struct SpeechDispatcher {
    sink: Arc<dyn SpeechSink>,
    emitter: Emitter,
    stats: Arc<RwLock<DispatchStats>>,
    preempt_rx: watch::Receiver<u64>,
    queue: VecDeque<DispatchRequest>,
    utterance: Option<(Uuid, Instant)>,
}

impl SpeechDispatcher {
    /// Spawns the worker task and returns a handle to it. The worker
    /// exits when every handle is dropped.
    pub fn spawn(sink: Arc<dyn SpeechSink>, emitter: Emitter) -> DispatcherHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (preempt_tx, preempt_rx) = watch::channel(0u64);
        let stats = Arc::new(RwLock::new(DispatchStats::default()));

        let worker = Self {
            sink,
            emitter,
            stats: Arc::clone(&stats),
            preempt_rx,
            queue: VecDeque::new(),
            utterance: None,
        };
        tokio::spawn(worker.run(cmd_rx));

        DispatcherHandle {
            cmd_tx,
            preempt_tx: Arc::new(preempt_tx),
            stats,
        }
    }

    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = cmd_rx.recv().await {
            self.apply(cmd).await;
            while let Ok(cmd) = cmd_rx.try_recv() {
                self.apply(cmd).await;
            }

            while let Some(request) = self.queue.pop_front() {
                self.push_one(request).await;
                // Preempts and enqueues that arrived during the push take
                // effect before the next fragment starts.
                while let Ok(cmd) = cmd_rx.try_recv() {
                    self.apply(cmd).await;
                }
            }
        }
    }

    async fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::BeginUtterance {
                utterance_id,
                started_at,
            } => {
                self.utterance = Some((utterance_id, started_at));
                *self.stats.write().await = DispatchStats::default();
            }
            Command::Enqueue(request) => {
                self.queue.push_back(request);
            }
            Command::Preempt { utterance_id } => {
                let before = self.queue.len();
                self.queue.retain(|r| {
                    !(r.utterance_id == utterance_id
                        && r.policy == InterruptPolicy::Interruptible)
                });
                let dropped = (before - self.queue.len()) as u64;
                if dropped > 0 {
                    self.stats.write().await.dropped_fragments += dropped;
                }
            }
            Command::Reset => {
                let dropped = self.queue.len() as u64;
                self.queue.clear();
                if dropped > 0 {
                    self.stats.write().await.dropped_fragments += dropped;
                }
            }
            Command::Sync(reply) => {
                let _ = reply.send(());
            }
        }
    }

    async fn push_one(&mut self, request: DispatchRequest) {
        let gen_at_start = *self.preempt_rx.borrow();
        let push_started = Instant::now();

        let result = match request.policy {
            InterruptPolicy::MustComplete => Some(
                self.sink
                    .push_speech(&request.text, false)
                    .await,
            ),
            InterruptPolicy::Interruptible => {
                let preempt_rx = self.preempt_rx.clone();
                tokio::select! {
                    result = self.sink.push_speech(&request.text, true) => Some(result),
                    _ = preempted(preempt_rx, gen_at_start) => None,
                }
            }
        };

        match result {
            None => {
                debug!(seq = request.seq, utterance_id = %request.utterance_id, "fragment preempted in flight");
                self.stats.write().await.dropped_fragments += 1;
            }
            Some(Ok(())) => {
                let push_ms = push_started.elapsed().as_millis() as u64;

                // Only the active utterance is credited: a fragment that
                // straddles an utterance boundary still speaks, but its
                // words must not skew the new utterance's accounting.
                let started_at = match self.utterance {
                    Some((id, started_at)) if id == request.utterance_id => Some(started_at),
                    _ => None,
                };
                if let Some(started_at) = started_at {
                    let mut stats = self.stats.write().await;
                    stats.spoken_word_count += word_count(&request.text);
                    stats.pushed_fragments += 1;
                    if stats.time_to_first_audio_ms.is_none() {
                        let ttfa = started_at.elapsed().as_millis() as u64;
                        stats.time_to_first_audio_ms = Some(ttfa);
                        drop(stats);
                        self.emitter
                            .metric(request.utterance_id, Metric::TimeToFirstAudioMs(ttfa));
                    }
                } else {
                    debug!(seq = request.seq, utterance_id = %request.utterance_id, "fragment outlived its utterance, not counted");
                }
                self.emitter
                    .metric(request.utterance_id, Metric::TtsPushLatencyMs(push_ms));
            }
            Some(Err(e)) => {
                // Dropped, not retried: a late retry would speak out of
                // order relative to fragments enqueued after it.
                self.stats.write().await.dropped_fragments += 1;
                self.emitter.event(PipelineEvent::SynthesisUnavailable {
                    utterance_id: request.utterance_id,
                    seq: request.seq,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Resolves once the preemption generation advances past `gen_at_start`.
async fn preempted(mut rx: watch::Receiver<u64>, gen_at_start: u64) {
    loop {
        if *rx.borrow_and_update() > gen_at_start {
            return;
        }
        if rx.changed().await.is_err() {
            // All handles dropped; nothing can preempt any more.
            std::future::pending::<()>().await;
        }
    }
}
