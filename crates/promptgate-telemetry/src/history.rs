//! Bounded in-memory decision history

use parking_lot::Mutex;
use promptgate_core::HistoryEntry;
use std::collections::VecDeque;

/// Default number of entries retained
pub const DEFAULT_CAPACITY: usize = 100;

/// Entries returned by [`HistoryLog::recent`] when no positive count is given
pub const DEFAULT_RECENT: usize = 20;

/// Fixed-capacity FIFO of past decisions, shared by every gateway
///
/// Entries are kept oldest-first. Appending to a full log evicts the oldest
/// entry. Contents are volatile and lost on restart.
#[derive(Debug)]
pub struct HistoryLog {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl HistoryLog {
    /// Create a log holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn append(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The last `n` entries, oldest first. `n <= 0` returns the last 20.
    pub fn recent(&self, n: i64) -> Vec<HistoryEntry> {
        let n = if n <= 0 {
            DEFAULT_RECENT
        } else {
            usize::try_from(n).unwrap_or(usize::MAX)
        };

        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
