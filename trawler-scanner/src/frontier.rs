use crate::item::WorkItem;
use crate::result::FetchState;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Traversal order of the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    #[default]
    Bfs,
    Dfs,
}

struct Entry {
    key: (u64, u8, u64),
    item: WorkItem,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierStats {
    pub queued: usize,
    pub leased: usize,
    pub completed: usize,
    pub failed: usize,
    pub dropped: usize,
}

#[derive(Default)]
struct Inner {
    heap: BinaryHeap<Reverse<Entry>>,
    seq: u64,
    closed: bool,
    stats: FrontierStats,
}

#[derive(Debug)]
pub enum PushError {
    Full(WorkItem),
    Closed(WorkItem),
}

/// Bounded queue of pending work. Items move queued -> leased -> completed,
/// failed or dropped.
pub struct Frontier {
    inner: Mutex<Inner>,
    capacity: usize,
    discipline: Discipline,
    item_ready: Notify,
    slot_freed: Notify,
}

impl Frontier {
    pub fn new(capacity: usize, discipline: Discipline) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            discipline,
            item_ready: Notify::new(),
            slot_freed: Notify::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key_for(&self, item: &WorkItem, seq: u64) -> (u64, u8, u64) {
        let depth = item.depth as u64;
        let rank = item.origin.rank();
        match self.discipline {
            Discipline::Bfs => (depth, rank, seq),
            Discipline::Dfs => (u64::MAX - depth, rank, u64::MAX - seq),
        }
    }

    pub fn try_push(&self, item: WorkItem) -> Result<(), PushError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(PushError::Closed(item));
        }
        if inner.heap.len() >= self.capacity {
            return Err(PushError::Full(item));
        }
        let seq = inner.seq;
        inner.seq += 1;
        let key = self.key_for(&item, seq);
        inner.heap.push(Reverse(Entry { key, item }));
        inner.stats.queued = inner.heap.len();
        drop(inner);
        self.item_ready.notify_one();
        Ok(())
    }

    /// Waits for a free slot when the frontier is full.
    pub async fn push(&self, mut item: WorkItem) -> Result<(), PushError> {
        loop {
            let notified = self.slot_freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(PushError::Full(back)) => item = back,
                Err(closed) => return Err(closed),
            }
            notified.await;
        }
    }

    /// Resolves once a slot may have been freed by a lease.
    pub async fn slot_freed(&self) {
        self.slot_freed.notified().await;
    }

    /// Next item by priority, waiting while empty. `None` once closed.
    pub async fn lease(&self) -> Option<WorkItem> {
        loop {
            let notified = self.item_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(Reverse(entry)) = inner.heap.pop() {
                    inner.stats.queued = inner.heap.len();
                    inner.stats.leased += 1;
                    drop(inner);
                    self.slot_freed.notify_one();
                    return Some(entry.item);
                }
            }
            notified.await;
        }
    }

    /// Releases a lease with its terminal state.
    pub fn finish(&self, state: FetchState) {
        let mut inner = self.lock();
        inner.stats.leased = inner.stats.leased.saturating_sub(1);
        match state {
            FetchState::Completed => inner.stats.completed += 1,
            FetchState::Failed => inner.stats.failed += 1,
            FetchState::Dropped => inner.stats.dropped += 1,
        }
    }

    /// Stops handing out work. Queued items are counted as dropped and their
    /// number is returned.
    pub fn close(&self) -> usize {
        let mut inner = self.lock();
        let mut remaining = 0;
        if !inner.closed {
            inner.closed = true;
            remaining = inner.heap.len();
            inner.heap.clear();
            inner.stats.queued = 0;
            inner.stats.dropped += remaining;
        }
        drop(inner);
        self.item_ready.notify_waiters();
        self.slot_freed.notify_waiters();
        remaining
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> FrontierStats {
        self.lock().stats
    }
}
