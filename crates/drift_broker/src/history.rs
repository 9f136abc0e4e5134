//! Bounded, time-stamped history ring for a topic.
//!
//! The ring retains the most recent messages published to a topic,
//! newest at the tail. On overflow the oldest entry is discarded, so the
//! retained window is always a contiguous suffix of the published
//! sequence.

use std::collections::VecDeque;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// How many entries a topic retains unless configured otherwise.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

struct Entry {
    msg: Bytes,
    ts: DateTime<Utc>,
}

/// A bounded ring of recent messages.
///
/// All access goes through one mutex; snapshots are short, so readers
/// take the same lock as `append`.
pub struct History {
    max: usize,
    buffer: Mutex<VecDeque<Entry>>,
}

impl History {
    /// Create a ring that retains up to `max` entries.
    pub fn new(max: usize) -> Self {
        Self {
            max,
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    /// Stamp `msg` with the current wall-clock time and append it,
    /// evicting from the head until the ring fits its capacity.
    pub fn append(&self, msg: Bytes) {
        let mut buffer = self.buffer.lock();
        buffer.push_back(Entry {
            msg,
            ts: Utc::now(),
        });
        while buffer.len() > self.max {
            buffer.pop_front();
        }
    }

    /// Up to `n` retained entries, oldest first.
    ///
    /// Because the ring evicts from the head, these are the oldest
    /// entries still in the retained window, not the newest n.
    pub fn last(&self, n: usize) -> Vec<Bytes> {
        let buffer = self.buffer.lock();
        buffer.iter().take(n).map(|e| e.msg.clone()).collect()
    }

    /// Every retained entry stamped strictly after `t`, oldest first.
    pub fn since(&self, t: DateTime<Utc>) -> Vec<Bytes> {
        let buffer = self.buffer.lock();
        buffer
            .iter()
            .filter(|e| e.ts > t)
            .map(|e| e.msg.clone())
            .collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// True when nothing has been retained yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}
