//! A total, ordered, in-memory view over a persisted log.
//!
//! Every mutation goes through [`LogStore`] so the durable store and the
//! in-memory mirror never diverge. A store is owned exclusively by the single
//! leader or follower instance that manages it; `&mut` access is the
//! atomicity boundary for truncation relative to concurrent readers.

use std::collections::BTreeMap;
use std::fmt;

use crate::storage::PersistedLog;
use crate::Entry;
use crate::LogIndex;
use crate::StorageError;
use crate::Term;

/// Read-only projection of a log's local frontier and commit point,
/// recomputed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Highest index present locally, not necessarily committed.
    pub spear_head: LogIndex,

    /// Highest index known committed.
    pub commit_index: LogIndex,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spearhead={} committed={}", self.spear_head, self.commit_index)
    }
}

/// Write-through adapter pairing a [`PersistedLog`] with a dense in-memory
/// mirror of all retained entries, from the oldest up to the spearhead.
///
/// Also tracks the commit index (monotonic) and the applied index, so the
/// state machine is never handed an index twice or out of order.
#[derive(Debug)]
pub struct LogStore<S: PersistedLog> {
    store: S,

    /// Mirror of the retained entries, keyed by index.
    entries: BTreeMap<LogIndex, Entry>,

    committed: LogIndex,

    applied: LogIndex,
}

impl<S: PersistedLog> LogStore<S> {
    /// Wrap `store`, replaying its contents to seed the mirror and the
    /// spearhead. This is the recovery path after a restart.
    pub fn new(store: S) -> Result<Self, StorageError> {
        let mut entries = BTreeMap::new();
        {
            let iter = store.read(1)?;
            for entry in iter {
                entries.insert(entry.log_id.index, entry);
            }
        }

        Ok(Self {
            store,
            entries,
            committed: 0,
            applied: 0,
        })
    }

    /// Highest index present locally; 0 when the log is empty.
    pub fn spear_head(&self) -> LogIndex {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn committed(&self) -> LogIndex {
        self.committed
    }

    pub fn applied(&self) -> LogIndex {
        self.applied
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            spear_head: self.spear_head(),
            commit_index: self.committed,
        }
    }

    pub fn entry(&self, index: LogIndex) -> Option<&Entry> {
        self.entries.get(&index)
    }

    /// Term recorded at `index`. Index 0 has term 0 by definition; an index
    /// that is not retained locally has no term.
    pub fn term_of(&self, index: LogIndex) -> Option<Term> {
        if index == 0 {
            return Some(0);
        }
        self.entries.get(&index).map(|e| e.log_id.term)
    }

    /// Clones of all entries at `from` and beyond, ascending.
    pub fn entries_from(&self, from: LogIndex) -> Vec<Entry> {
        self.entries.range(from..).map(|(_, e)| e.clone()).collect()
    }

    /// Append a contiguous run of entries, durable store first.
    pub fn append(&mut self, entries: Vec<Entry>) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }

        debug_assert_eq!(
            self.spear_head() + 1,
            entries[0].log_id.index,
            "appended entries must continue the local log"
        );

        self.store.insert(entries.iter().cloned())?;
        for entry in entries {
            self.entries.insert(entry.log_id.index, entry);
        }
        Ok(())
    }

    /// Remove index `from` and everything after it, durable store first.
    pub fn truncate_back(&mut self, from: LogIndex) -> Result<(), StorageError> {
        self.store.remove_back(from)?;
        self.entries.split_off(&from);
        Ok(())
    }

    /// Drop every entry below `before`. Compaction policy is external; the
    /// caller must not trim away an uncommitted or unapplied suffix.
    pub fn trim_front(&mut self, before: LogIndex) -> Result<(), StorageError> {
        self.store.remove_front(before)?;
        self.entries = self.entries.split_off(&before);
        Ok(())
    }

    /// Clear the log entirely, including commit and apply bookkeeping.
    pub fn purge_all(&mut self) -> Result<(), StorageError> {
        self.store.drop_all()?;
        self.entries.clear();
        self.committed = 0;
        self.applied = 0;
        Ok(())
    }

    /// Advance the commit index towards `index`, clamped to the spearhead.
    /// The commit index never decreases. Returns the resulting value.
    pub(crate) fn update_committed(&mut self, index: LogIndex) -> LogIndex {
        let ceiling = std::cmp::min(index, self.spear_head());
        if ceiling > self.committed {
            self.committed = ceiling;
        }
        self.committed
    }

    /// Committed entries not yet handed to the state machine, ascending.
    pub(crate) fn unapplied(&self) -> Vec<Entry> {
        if self.committed <= self.applied {
            return Vec::new();
        }
        self.entries.range(self.applied + 1..=self.committed).map(|(_, e)| e.clone()).collect()
    }

    pub(crate) fn mark_applied(&mut self, index: LogIndex) {
        debug_assert!(index <= self.committed, "cannot apply past the commit index");
        if index > self.applied {
            self.applied = index;
        }
    }
}
