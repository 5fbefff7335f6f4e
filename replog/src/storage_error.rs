//! Errors raised by the storage collaborators.

use anyerror::AnyError;

use crate::LogId;
use crate::LogIndex;

/// The subject a storage error is about.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorSubject {
    /// A general storage error.
    Store,

    /// Error that happened when operating a series of log entries.
    Logs,

    /// Error about a single log entry.
    Log(LogId),

    /// Error about a single log entry without knowing the log term.
    LogIndex(LogIndex),

    /// Error happened when applying a log entry to the state machine.
    Apply(LogId),

    /// Error happened when operating the state machine.
    StateMachine,
}

/// What it is doing when an error occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorVerb {
    Read,
    Write,
    Delete,
}

/// Error that occurs when operating the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("when {verb:?} {subject:?}: {source}")]
pub struct StorageError {
    /// The subject that the error is about.
    pub subject: ErrorSubject,

    /// The operation that was underway.
    pub verb: ErrorVerb,

    /// The underlying cause.
    pub source: AnyError,
}

impl StorageError {
    pub fn new(subject: ErrorSubject, verb: ErrorVerb, source: AnyError) -> Self {
        Self {
            subject,
            verb,
            source,
        }
    }

    pub fn read_logs(source: AnyError) -> Self {
        Self::new(ErrorSubject::Logs, ErrorVerb::Read, source)
    }

    pub fn write_logs(source: AnyError) -> Self {
        Self::new(ErrorSubject::Logs, ErrorVerb::Write, source)
    }

    pub fn delete_logs(source: AnyError) -> Self {
        Self::new(ErrorSubject::Logs, ErrorVerb::Delete, source)
    }

    pub fn apply(log_id: LogId, source: AnyError) -> Self {
        Self::new(ErrorSubject::Apply(log_id), ErrorVerb::Write, source)
    }
}
