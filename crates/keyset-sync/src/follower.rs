//! Followers: replicas that trail a leader set.
//!
//! A [`Follower`] owns a replica [`KeyedSet`] and a [`MarkedPatch`] on the
//! leader. The leader keeps mutating freely; the follower applies what is
//! pending in bounded batches whenever it is asked to. Because the mark
//! coalesces, a follower that falls behind only ever has to apply the net
//! change, never the full history.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use keyset_core::{DiffOptions, JsonKeyer, KeyOf, KeyedSet, Keyer, MarkedPatch, Patch, SetEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};

/// Counters for work done by a follower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Events applied to the replica.
    pub applied: usize,
    /// Applied events that changed the replica.
    pub changed: usize,
    /// Batches applied.
    pub batches: usize,
    /// Bytes produced by [`Follower::encode_batch`].
    pub encoded_bytes: usize,
}

/// A replica kept consistent with a leader set.
pub struct Follower<T, KR: Keyer<T> = JsonKeyer> {
    replica: KeyedSet<T, KR>,
    initial: Patch<KeyOf<T, KR>, T>,
    mark: MarkedPatch<KeyOf<T, KR>, T>,
    config: SyncConfig,
    stats: SyncStats,
}

impl<T, KR> Follower<T, KR>
where
    T: Clone + 'static,
    KR: Keyer<T> + 'static,
    KR::Key: 'static,
{
    /// Follow `leader` starting from a copy of its current contents.
    pub fn new(leader: &KeyedSet<T, KR>, config: SyncConfig) -> Self {
        let replica = leader.clone();
        Self::start(leader, replica, Patch::new(), config)
    }

    /// Follow `leader` with an existing replica of arbitrary contents.
    ///
    /// The patch from the replica to the leader's current contents is
    /// queued ahead of the leader's live events.
    pub fn attach(leader: &KeyedSet<T, KR>, replica: KeyedSet<T, KR>, config: SyncConfig) -> Self {
        let options = DiffOptions {
            no_clear: !config.clear_on_empty,
        };
        let initial = replica.diff_with(leader, options);
        debug!(initial = initial.len(), "follower attached");
        Self::start(leader, replica, initial, config)
    }

    fn start(
        leader: &KeyedSet<T, KR>,
        replica: KeyedSet<T, KR>,
        initial: Patch<KeyOf<T, KR>, T>,
        config: SyncConfig,
    ) -> Self {
        Self {
            replica,
            initial,
            mark: leader.mark(),
            config,
            stats: SyncStats::default(),
        }
    }

    pub fn replica(&self) -> &KeyedSet<T, KR> {
        &self.replica
    }

    pub fn into_replica(self) -> KeyedSet<T, KR> {
        self.replica
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Number of events waiting to be applied.
    pub fn backlog(&self) -> usize {
        self.initial.len() + self.mark.len()
    }

    fn next_event(&mut self) -> Option<SetEvent<T, KR>> {
        self.initial.shift().or_else(|| self.mark.shift())
    }

    fn take_batch(&mut self) -> Patch<KeyOf<T, KR>, T> {
        let limit = self.config.max_batch_size.max(1);
        std::iter::from_fn(|| self.next_event()).take(limit).collect()
    }

    /// Put unapplied events back at the head of the queue, keeping their
    /// order ahead of anything queued later.
    fn requeue(&mut self, batch: Patch<KeyOf<T, KR>, T>) {
        let size = batch.len();
        for event in batch.into_iter().rev() {
            self.initial.push_front(event);
        }
        debug!(size, backlog = self.backlog(), "events requeued");
    }

    /// Apply events one at a time. If the replica reports an error, the
    /// failing event counts as applied and the rest of the batch is requeued.
    fn apply(&mut self, mut batch: Patch<KeyOf<T, KR>, T>) -> Result<usize> {
        let mut applied = 0;
        let mut changed = 0;
        let mut outcome = Ok(());
        while let Some(event) = batch.shift() {
            applied += 1;
            match self.replica.change(event) {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        self.stats.applied += applied;
        self.stats.changed += changed;
        self.stats.batches += 1;
        if !batch.is_empty() {
            self.requeue(batch);
        }
        outcome?;
        debug!(size = applied, changed, backlog = self.backlog(), "batch applied");
        Ok(applied)
    }

    /// Apply up to `max_batch_size` pending events. Returns how many were
    /// applied.
    ///
    /// Fails with [`SyncError::Closed`] once the follower is closed and
    /// everything pending has been applied.
    pub fn pull(&mut self) -> Result<usize> {
        if self.backlog() == 0 {
            return self.idle();
        }
        let batch = self.take_batch();
        self.apply(batch)
    }

    /// Pull until nothing is pending. Returns the total applied.
    pub fn catch_up(&mut self) -> Result<usize> {
        let mut total = 0;
        while self.backlog() > 0 {
            total += self.pull()?;
        }
        trace!(total, "caught up");
        Ok(total)
    }

    fn idle<R: Default>(&self) -> Result<R> {
        if self.is_closed() {
            Err(SyncError::Closed)
        } else {
            Ok(R::default())
        }
    }

    /// Whether the replica holds exactly the leader's members.
    pub fn is_converged(&self, leader: &KeyedSet<T, KR>) -> bool {
        self.replica.deep_equal(leader)
    }

    /// Stop following the leader. Events already pending stay pullable.
    pub fn close(&mut self) {
        self.mark.close();
    }

    pub fn is_closed(&self) -> bool {
        self.mark.is_closed()
    }
}

impl<T, KR> Follower<T, KR>
where
    T: Clone + Serialize + 'static,
    KR: Keyer<T> + 'static,
    KR::Key: Serialize + 'static,
{
    /// Take the next batch off the queue as a JSON array of wire events,
    /// or `None` when nothing is pending.
    pub fn encode_batch(&mut self) -> Result<Option<String>> {
        if self.backlog() == 0 {
            return self.idle();
        }
        let batch = self.take_batch();
        let text = match batch.to_json() {
            Ok(text) => text,
            Err(err) => {
                self.requeue(batch);
                return Err(err.into());
            }
        };
        self.stats.encoded_bytes += text.len();
        trace!(bytes = text.len(), "batch encoded");
        Ok(Some(text))
    }
}

impl<T, KR> Follower<T, KR>
where
    T: Clone + DeserializeOwned + 'static,
    KR: Keyer<T> + 'static,
    KR::Key: DeserializeOwned + 'static,
{
    /// Decode a batch produced by [`Follower::encode_batch`] and apply it to
    /// the replica.
    pub fn apply_encoded(&mut self, text: &str) -> Result<usize> {
        let batch = Patch::from_json(text)?;
        self.apply(batch)
    }
}

impl<T, KR> fmt::Debug for Follower<T, KR>
where
    T: fmt::Debug,
    KR: Keyer<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Follower")
            .field("replica", &self.replica)
            .field("initial", &self.initial.len())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
