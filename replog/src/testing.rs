//! Builders shared by this crate's tests and by downstream test suites.

use crate::Entry;
use crate::LogId;
use crate::LogIndex;
use crate::Payload;
use crate::Term;

/// Build a log id.
pub fn log_id(term: Term, index: LogIndex) -> LogId {
    LogId::new(term, index)
}

/// Build an entry with an empty payload.
pub fn blank(term: Term, index: LogIndex) -> Entry {
    Entry::new(log_id(term, index), Payload::default())
}

/// Build an entry carrying `payload`.
pub fn entry(term: Term, index: LogIndex, payload: impl Into<Payload>) -> Entry {
    Entry::new(log_id(term, index), payload.into())
}
