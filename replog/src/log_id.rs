//! The identity of a log entry: the leadership term it was proposed under and
//! its position in the log.

use std::fmt::Display;
use std::fmt::Formatter;

/// A leadership epoch number.
///
/// Terms are totally ordered; a higher term always supersedes a lower one.
/// Which participant holds the leadership of a term is decided externally and
/// handed to this crate through `become_leader` / `become_follower`.
pub type Term = u64;

/// A 1-based position within a single replicated log.
///
/// Index `0` means "no entry": an empty log, or the position preceding the
/// first entry in an `AppendEntriesRequest` that starts at the beginning.
pub type LogIndex = u64;

/// The identity of a log entry.
///
/// Within one log, indices are consecutive starting at 1, and the term
/// recorded for an index only ever changes when a conflicting suffix is
/// truncated and replaced under a higher term.
#[derive(Debug, Default, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LogId {
    /// The term under which the entry was proposed.
    pub term: Term,

    /// The index of the entry in the log.
    pub index: LogIndex,
}

impl LogId {
    pub fn new(term: Term, index: LogIndex) -> Self {
        Self { term, index }
    }
}

impl Display for LogId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.term, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::LogId;

    #[test]
    fn log_id_ordering_is_term_major() {
        assert!(LogId::new(2, 1) > LogId::new(1, 9));
        assert!(LogId::new(2, 3) > LogId::new(2, 2));
        assert_eq!(LogId::new(1, 1), LogId::new(1, 1));
    }

    #[test]
    fn log_id_display() {
        assert_eq!("3-14", LogId::new(3, 14).to_string());
    }
}
