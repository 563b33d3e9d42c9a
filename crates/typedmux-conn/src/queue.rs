use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use typedmux_frame::Fingerprint;

use crate::error::{ConnError, Result};

/// Default bound on frames deferred for a single fingerprint.
pub const DEFAULT_MAX_PENDING_PER_TYPE: usize = 1024;

/// Default bound on frames deferred across all fingerprints.
pub const DEFAULT_MAX_PENDING_TOTAL: usize = 16 * 1024;

/// Tagged payloads received before anyone asked for their type.
///
/// One FIFO per fingerprint; frames of the same type are never reordered.
/// Entries are removed as soon as their queue drains.
#[derive(Debug)]
pub struct PendingQueues {
    queues: HashMap<Fingerprint, VecDeque<Bytes>>,
    total: usize,
    max_per_type: usize,
    max_total: usize,
}

impl Default for PendingQueues {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_PENDING_PER_TYPE, DEFAULT_MAX_PENDING_TOTAL)
    }
}

impl PendingQueues {
    pub fn with_limits(max_per_type: usize, max_total: usize) -> Self {
        Self {
            queues: HashMap::new(),
            total: 0,
            max_per_type,
            max_total,
        }
    }

    /// Append a payload to the tail of its fingerprint's queue.
    ///
    /// Fails with [`ConnError::QueueFull`] instead of growing past either
    /// bound; the payload is not stored in that case.
    pub fn push(&mut self, fingerprint: Fingerprint, payload: Bytes) -> Result<()> {
        if self.total >= self.max_total {
            return Err(ConnError::QueueFull {
                fingerprint,
                limit: self.max_total,
            });
        }
        if self.len(&fingerprint) >= self.max_per_type {
            return Err(ConnError::QueueFull {
                fingerprint,
                limit: self.max_per_type,
            });
        }
        self.queues.entry(fingerprint).or_default().push_back(payload);
        self.total += 1;
        Ok(())
    }

    /// Remove and return the oldest payload for a fingerprint.
    pub fn pop(&mut self, fingerprint: &Fingerprint) -> Option<Bytes> {
        let queue = self.queues.get_mut(fingerprint)?;
        let payload = queue.pop_front();
        if queue.is_empty() {
            self.queues.remove(fingerprint);
        }
        if payload.is_some() {
            self.total -= 1;
        }
        payload
    }

    /// Payloads waiting for one fingerprint.
    pub fn len(&self, fingerprint: &Fingerprint) -> usize {
        self.queues.get(fingerprint).map_or(0, VecDeque::len)
    }

    /// Payloads waiting across all fingerprints.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn clear(&mut self) {
        self.queues.clear();
        self.total = 0;
    }
}
