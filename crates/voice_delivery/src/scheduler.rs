//! Per-key FIFO playback scheduler
//!
//! Every key owns a chain of pending tasks. A new task waits for the task
//! enqueued before it under the same key, whatever that task's outcome, and
//! then runs. Keys never wait on each other.
//!
//! The map only holds the most recent task per key. When a task finishes it
//! removes the entry only if the entry still points at itself, so a task
//! enqueued in the meantime keeps its place.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::SchedulerError;

/// Most recently enqueued task for a key
struct Tail {
    seq: u64,
    done: watch::Receiver<bool>,
}

struct Chains<K> {
    tails: HashMap<K, Tail>,
    next_seq: u64,
}

/// Serializes tasks per key; cloning shares the same chains
pub struct PlaybackScheduler<K> {
    chains: Arc<Mutex<Chains<K>>>,
}

impl<K> Clone for PlaybackScheduler<K> {
    fn clone(&self) -> Self {
        Self {
            chains: Arc::clone(&self.chains),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for PlaybackScheduler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chains = self.chains.lock();
        f.debug_struct("PlaybackScheduler")
            .field("active_keys", &chains.tails.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K> Default for PlaybackScheduler<K> {
    fn default() -> Self {
        Self {
            chains: Arc::new(Mutex::new(Chains {
                tails: HashMap::new(),
                next_seq: 0,
            })),
        }
    }
}

impl<K> PlaybackScheduler<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` behind every task already queued for `key`
    ///
    /// Must be called from within a Tokio runtime. The returned handle
    /// resolves with this task's own output; dropping it does not cancel
    /// the task.
    pub fn enqueue<F, T>(&self, key: K, task: F) -> PlaybackHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = watch::channel(false);

        let (seq, previous) = {
            let mut chains = self.chains.lock();
            let seq = chains.next_seq;
            chains.next_seq = chains.next_seq.wrapping_add(1);
            let previous = chains
                .tails
                .insert(key.clone(), Tail { seq, done: done_rx })
                .map(|tail| tail.done);
            (seq, previous)
        };

        debug!(?key, seq, queued_behind = previous.is_some(), "Playback task enqueued");

        let guard = CompletionGuard {
            chains: Arc::clone(&self.chains),
            key,
            seq,
            done: done_tx,
        };

        let join = tokio::spawn(async move {
            // Dropped on completion, failure or panic alike
            let _guard = guard;
            if let Some(mut previous) = previous {
                // A closed channel means the predecessor is gone too
                let _ = previous.wait_for(|done| *done).await;
            }
            trace!(seq, "Playback task started");
            task.await
        });

        PlaybackHandle { join }
    }

    /// Keys that still have a running or pending task
    #[must_use]
    pub fn active_keys(&self) -> Vec<K> {
        self.chains.lock().tails.keys().cloned().collect()
    }

    /// Whether nothing is running or queued for `key`
    #[must_use]
    pub fn is_idle(&self, key: &K) -> bool {
        !self.chains.lock().tails.contains_key(key)
    }
}

/// Releases the successor and cleans up the chain entry
struct CompletionGuard<K: Eq + Hash> {
    chains: Arc<Mutex<Chains<K>>>,
    key: K,
    seq: u64,
    done: watch::Sender<bool>,
}

impl<K: Eq + Hash> Drop for CompletionGuard<K> {
    fn drop(&mut self) {
        self.done.send_replace(true);

        let mut chains = self.chains.lock();
        if chains
            .tails
            .get(&self.key)
            .is_some_and(|tail| tail.seq == self.seq)
        {
            chains.tails.remove(&self.key);
        }
    }
}

/// Resolves with the output of one scheduled task
pub struct PlaybackHandle<T> {
    join: JoinHandle<T>,
}

impl<T> fmt::Debug for PlaybackHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("finished", &self.join.is_finished())
            .finish()
    }
}

impl<T> PlaybackHandle<T> {
    /// Whether the task has completed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T> Future for PlaybackHandle<T> {
    type Output = Result<T, SchedulerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.join).poll(cx).map(|result| {
            result.map_err(|err| {
                if err.is_panic() {
                    SchedulerError::TaskPanicked
                } else {
                    SchedulerError::Cancelled
                }
            })
        })
    }
}
