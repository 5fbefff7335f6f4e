//! The logical request/response contract between a leader and its followers.
//!
//! This crate owns no wire format; a transport collaborator must carry these
//! two types verbatim.

use std::fmt;

use crate::display_ext::DisplaySlice;
use crate::Entry;
use crate::LogIndex;
use crate::ParticipantId;
use crate::Term;

/// Sent by the leader to replicate a contiguous run of entries.
///
/// `entries` logically follow the entry at `prev_log_index`/`prev_log_term`.
/// A request with empty `entries` is a heartbeat: it appends nothing but
/// still carries `leader_commit`, letting the follower advance its own
/// commit index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AppendEntriesRequest {
    /// The term the sending leader is serving.
    pub leader_term: Term,

    pub leader_id: ParticipantId,

    /// Term of the entry immediately preceding `entries`.
    pub prev_log_term: Term,

    /// Index of the entry immediately preceding `entries`; 0 means the
    /// request starts at the beginning of the log.
    pub prev_log_index: LogIndex,

    /// The leader's commit index at the time the request was built.
    pub leader_commit: LogIndex,

    /// The entries to store.
    pub entries: Vec<Entry>,
}

impl fmt::Display for AppendEntriesRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "leader={}@{}, prev={}-{}, commit={}, entries={}",
            self.leader_id,
            self.leader_term,
            self.prev_log_term,
            self.prev_log_index,
            self.leader_commit,
            DisplaySlice(&self.entries),
        )
    }
}

/// The follower's reply to an [`AppendEntriesRequest`].
///
/// `success=false` signals either a stale leader term or a consistency
/// mismatch at `prev_log_index`; `log_term` always carries the follower's
/// current term so a superseded leader can tell it has been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AppendEntriesResult {
    pub success: bool,

    pub log_term: Term,
}

impl AppendEntriesResult {
    pub fn granted(log_term: Term) -> Self {
        Self {
            success: true,
            log_term,
        }
    }

    pub fn rejected(log_term: Term) -> Self {
        Self {
            success: false,
            log_term,
        }
    }
}

impl fmt::Display for AppendEntriesResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            if self.success { "success" } else { "rejected" },
            self.log_term
        )
    }
}
