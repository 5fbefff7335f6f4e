#![doc = include_str!("../README.md")]

mod display_ext;
mod progress;

pub mod entry;
pub mod error;
pub mod follower;
pub mod leader;
pub mod log_id;
pub mod log_store;
pub mod message;
pub mod quorum;
pub mod storage;
pub mod storage_error;
pub mod testing;
pub mod wait;

pub use crate::entry::Entry;
pub use crate::entry::Payload;
pub use crate::error::InsertError;
pub use crate::error::NotFollower;
pub use crate::error::NotLeader;
pub use crate::follower::AppendEntriesReply;
pub use crate::follower::LogFollower;
pub use crate::leader::LogLeader;
pub use crate::leader::Replicate;
pub use crate::log_id::LogId;
pub use crate::log_id::LogIndex;
pub use crate::log_id::Term;
pub use crate::log_store::LogStore;
pub use crate::log_store::Statistics;
pub use crate::message::AppendEntriesRequest;
pub use crate::message::AppendEntriesResult;
pub use crate::quorum::QuorumSet;
pub use crate::quorum::WriteConcern;
pub use crate::storage::PersistedLog;
pub use crate::storage::StateMachine;
pub use crate::storage_error::ErrorSubject;
pub use crate::storage_error::ErrorVerb;
pub use crate::storage_error::StorageError;
pub use crate::wait::QuorumInfo;
pub use crate::wait::WaitHandle;

/// The identity of a leader or follower instance within one logical log.
///
/// Every participant belongs to at most one logical log at a time; assigning
/// ids across logs is the surrounding service's concern.
pub type ParticipantId = u64;
