//! Pending-commit completions, keyed by awaited log index.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tokio::sync::oneshot;

use crate::LogIndex;
use crate::ParticipantId;
use crate::Term;

/// Proof of commitment handed to a resolved waiter: the leadership term, the
/// commit index whose advance resolved it, and the participants whose
/// acknowledgments formed the quorum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuorumInfo {
    pub term: Term,

    /// The commit index at the moment of resolution. At least the awaited
    /// index, possibly larger when several indices committed in one step.
    pub index: LogIndex,

    /// Every member of this set has acknowledged an index >= `index`.
    pub quorum: BTreeSet<ParticipantId>,
}

/// A suspended computation that resolves once the awaited index is committed.
///
/// Dropping the handle abandons the wait; other waiters are unaffected. The
/// sender side is dropped without resolving when the leader steps down via a
/// new `become_leader` call, which a caller observes as a closed channel.
pub type WaitHandle = oneshot::Receiver<QuorumInfo>;

/// A sorted collection of still-unresolved completions per index.
///
/// Registration and resolution are pure data-structure operations with no
/// I/O; this registry never blocks.
#[derive(Debug, Default)]
pub(crate) struct WaitForRegistry {
    waiters: BTreeMap<LogIndex, Vec<oneshot::Sender<QuorumInfo>>>,
}

impl WaitForRegistry {
    /// Register a completion for `index`.
    ///
    /// The caller is responsible for resolving immediately instead when
    /// `index` is already committed.
    pub(crate) fn register(&mut self, index: LogIndex) -> WaitHandle {
        let (tx, rx) = oneshot::channel();
        self.waiters.entry(index).or_default().push(tx);
        rx
    }

    /// Resolve every waiter at an index <= `commit`, in ascending index
    /// order, all with the same quorum info.
    pub(crate) fn resolve_up_to(&mut self, commit: LogIndex, info: &QuorumInfo) {
        let keep = self.waiters.split_off(&(commit + 1));
        let resolved = std::mem::replace(&mut self.waiters, keep);

        for (_index, senders) in resolved {
            for tx in senders {
                // A send error means the waiter dropped its handle; that
                // abandons only this completion.
                let _ = tx.send(info.clone());
            }
        }
    }

    #[allow(dead_code)]
    pub(crate) fn pending(&self) -> usize {
        self.waiters.values().map(Vec::len).sum()
    }
}
