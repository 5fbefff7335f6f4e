//! Error types exposed by this crate.
//!
//! Protocol outcomes — a stale term or a consistency mismatch — are not
//! errors: they are reported through [`AppendEntriesResult`] and recovered
//! locally. The types here cover caller mistakes (using a role before it was
//! assigned) and storage failures bubbling up from the collaborators.
//!
//! [`AppendEntriesResult`]: crate::AppendEntriesResult

use thiserror::Error;

use crate::ParticipantId;
use crate::StorageError;

/// The participant is not currently serving as leader.
///
/// Returned by leader-role operations invoked before `become_leader`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("participant {id} is not serving as leader")]
pub struct NotLeader {
    pub id: ParticipantId,
}

/// The participant is not currently following any leader.
///
/// Returned by `append_entries` invoked before `become_follower`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("participant {id} is not following any leader")]
pub struct NotFollower {
    pub id: ParticipantId,
}

/// Errors returned by `LogLeader::insert`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error(transparent)]
    NotLeader(#[from] NotLeader),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
