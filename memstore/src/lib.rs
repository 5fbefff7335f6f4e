#![doc = include_str!("../README.md")]

#[cfg(test)]
mod test;

use std::collections::BTreeMap;

use anyerror::AnyError;
use replog::Entry;
use replog::ErrorSubject;
use replog::ErrorVerb;
use replog::LogIndex;
use replog::PersistedLog;
use replog::StateMachine;
use replog::StorageError;

/// An in-memory implementation of the [`PersistedLog`] contract, for demo
/// and testing purposes.
///
/// Entries live in a `BTreeMap` keyed by index. `fail_next` lets tests
/// inject a one-shot storage failure into the next mutating operation.
#[derive(Debug, Default)]
pub struct MemLogStore {
    log: BTreeMap<LogIndex, Entry>,
    fail_next: bool,
}

impl MemLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Make the next mutating operation fail with a storage error.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    fn check_fail(&mut self, verb: ErrorVerb) -> Result<(), StorageError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(StorageError::new(
                ErrorSubject::Logs,
                verb,
                AnyError::error("injected failure"),
            ));
        }
        Ok(())
    }
}

impl PersistedLog for MemLogStore {
    #[tracing::instrument(level = "trace", skip(self, entries))]
    fn insert<I>(&mut self, entries: I) -> Result<(), StorageError>
    where I: IntoIterator<Item = Entry> {
        self.check_fail(ErrorVerb::Write)?;
        for entry in entries {
            self.log.insert(entry.log_id.index, entry);
        }
        Ok(())
    }

    fn read(&self, from: LogIndex) -> Result<Box<dyn Iterator<Item = Entry> + '_>, StorageError> {
        Ok(Box::new(self.log.range(from..).map(|(_, entry)| entry.clone())))
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn remove_front(&mut self, before: LogIndex) -> Result<(), StorageError> {
        self.check_fail(ErrorVerb::Delete)?;
        self.log = self.log.split_off(&before);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn remove_back(&mut self, from: LogIndex) -> Result<(), StorageError> {
        self.check_fail(ErrorVerb::Delete)?;
        self.log.split_off(&from);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn drop_all(&mut self) -> Result<(), StorageError> {
        self.check_fail(ErrorVerb::Delete)?;
        self.log.clear();
        Ok(())
    }
}

/// An in-memory [`StateMachine`] that records applied entries and refuses
/// out-of-order or duplicate application.
#[derive(Debug, Default)]
pub struct MemStateMachine {
    applied: BTreeMap<LogIndex, Entry>,
    last_applied: LogIndex,
}

impl MemStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest index applied so far; 0 when nothing has been applied.
    pub fn last_applied(&self) -> LogIndex {
        self.last_applied
    }

    pub fn get(&self, index: LogIndex) -> Option<&Entry> {
        self.applied.get(&index)
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

impl StateMachine for MemStateMachine {
    #[tracing::instrument(level = "trace", skip(self, entries))]
    fn apply(&mut self, entries: &[Entry]) -> Result<(), StorageError> {
        for entry in entries {
            let index = entry.log_id.index;
            if index != self.last_applied + 1 {
                return Err(StorageError::apply(
                    entry.log_id,
                    AnyError::error(format!(
                        "out-of-order apply: expected {}, got {}",
                        self.last_applied + 1,
                        index
                    )),
                ));
            }
            self.applied.insert(index, entry.clone());
            self.last_applied = index;
        }
        Ok(())
    }
}
