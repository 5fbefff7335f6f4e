//! The active replica role: accepts writes, replicates them and advances the
//! commit index.

use tokio::sync::oneshot;

use crate::error::InsertError;
use crate::error::NotLeader;
use crate::log_store::LogStore;
use crate::log_store::Statistics;
use crate::progress::Progress;
use crate::progress::VecProgress;
use crate::quorum::WriteConcern;
use crate::storage::PersistedLog;
use crate::storage::StateMachine;
use crate::wait::QuorumInfo;
use crate::wait::WaitForRegistry;
use crate::wait::WaitHandle;
use crate::AppendEntriesRequest;
use crate::AppendEntriesResult;
use crate::Entry;
use crate::LogId;
use crate::LogIndex;
use crate::ParticipantId;
use crate::Payload;
use crate::StorageError;
use crate::Term;

/// An outbound replication request produced by [`LogLeader::run_async_step`].
///
/// Transport is a collaborator: the caller carries `request` to `target` and
/// feeds the reply back through `handle_append_entries_result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replicate {
    pub target: ParticipantId,
    pub request: AppendEntriesRequest,
}

/// Per-follower replication cursor, owned and mutated only by the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FollowerCursor {
    /// First index the next request to this follower will carry.
    next_index: LogIndex,

    /// Last index covered by the most recently built request, including a
    /// heartbeat's `prev_log_index`.
    last_sent: LogIndex,

    /// Highest index this follower has acknowledged. Folded into the commit
    /// calculation at the next `run_async_step`.
    acked: LogIndex,
}

/// Leader-role tracking for one term, discarded wholesale by the next
/// `become_leader` call.
struct Leading {
    term: Term,

    write_concern: WriteConcern,

    followers: Vec<(ParticipantId, FollowerCursor)>,

    /// Acknowledged index per participant, leader included; derives the
    /// commit index through the write-concern quorum.
    progress: VecProgress<ParticipantId, LogIndex, WriteConcern>,

    waiters: WaitForRegistry,
}

/// The active replica role for one logical log.
///
/// All replication work happens inside [`run_async_step`]; `insert` is a
/// purely local append and never suspends. The instance owns its log store
/// exclusively; to share it across threads put it behind a mutex and await
/// the returned [`WaitHandle`]s elsewhere.
///
/// [`run_async_step`]: LogLeader::run_async_step
pub struct LogLeader<S: PersistedLog, SM: StateMachine> {
    id: ParticipantId,
    log: LogStore<S>,
    state_machine: SM,
    leading: Option<Leading>,
}

impl<S: PersistedLog, SM: StateMachine> LogLeader<S, SM> {
    pub fn new(id: ParticipantId, log: LogStore<S>, state_machine: SM) -> Self {
        Self {
            id,
            log,
            state_machine,
            leading: None,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// The term this instance is leading, if any.
    pub fn current_term(&self) -> Option<Term> {
        self.leading.as_ref().map(|l| l.term)
    }

    /// The write-concern in force for the current leadership, if any.
    pub fn write_concern(&self) -> Option<WriteConcern> {
        self.leading.as_ref().map(|l| l.write_concern)
    }

    pub fn statistics(&self) -> Statistics {
        self.log.statistics()
    }

    pub fn entry(&self, index: LogIndex) -> Option<&Entry> {
        self.log.entry(index)
    }

    pub fn log_store(&self) -> &LogStore<S> {
        &self.log
    }

    pub fn state_machine(&self) -> &SM {
        &self.state_machine
    }

    /// Adopt the leader role for `term`, discarding any prior follower set
    /// and its pending waiters.
    ///
    /// Replication cursors start optimistically at the spearhead;
    /// acknowledged indices start at zero and are earned through replies.
    #[tracing::instrument(level = "debug", skip(self, followers), fields(id = self.id))]
    pub fn become_leader(
        &mut self,
        term: Term,
        followers: Vec<ParticipantId>,
        write_concern: WriteConcern,
    ) {
        let spear_head = self.log.spear_head();

        let cursors = followers
            .iter()
            .map(|id| {
                (*id, FollowerCursor {
                    next_index: spear_head + 1,
                    last_sent: 0,
                    acked: 0,
                })
            })
            .collect();

        let progress = VecProgress::new([self.id].iter().chain(followers.iter()), write_concern);

        tracing::info!(term, %write_concern, n_followers = followers.len(), "becoming leader");

        self.leading = Some(Leading {
            term,
            write_concern,
            followers: cursors,
            progress,
            waiters: WaitForRegistry::default(),
        });
    }

    /// Append `payload` to the local log at `spearhead + 1` under the
    /// current term. Returns the assigned index immediately; replication
    /// happens at the next `run_async_step`.
    pub fn insert(&mut self, payload: Payload) -> Result<LogIndex, InsertError> {
        let term = match &self.leading {
            Some(leading) => leading.term,
            None => return Err(NotLeader { id: self.id }.into()),
        };

        let index = self.log.spear_head() + 1;
        let entry = Entry::new(LogId::new(term, index), payload);
        self.log.append(vec![entry])?;

        tracing::debug!(term, index, "entry appended locally");
        Ok(index)
    }

    /// A suspended computation that resolves once the commit index reaches
    /// `index`, yielding the term and the participant set whose
    /// acknowledgments formed the quorum.
    ///
    /// An index that is already committed resolves before this call returns.
    /// Dropping the handle abandons only this waiter.
    pub fn wait_for(&mut self, index: LogIndex) -> Result<WaitHandle, NotLeader> {
        let leading = match self.leading.as_mut() {
            Some(leading) => leading,
            None => return Err(NotLeader { id: self.id }),
        };

        let committed = self.log.committed();
        if index <= committed {
            let info = QuorumInfo {
                term: leading.term,
                index: committed,
                quorum: leading.progress.granted().into_iter().collect(),
            };
            let (tx, rx) = oneshot::channel();
            // The receiver is still held right here; the send cannot fail.
            let _ = tx.send(info);
            return Ok(rx);
        }

        Ok(leading.waiters.register(index))
    }

    /// The leader's single scheduling point.
    ///
    /// Builds one [`AppendEntriesRequest`] per follower carrying every entry
    /// past its cursor (an empty run is a heartbeat), then folds previously
    /// received acknowledgments plus the leader's own spearhead into the
    /// commit index, applies newly committed entries to the state machine in
    /// order, and resolves all waiters at or below the new commit index.
    ///
    /// Invoked without a leader role this is a no-op: an external driver may
    /// keep stepping across role changes.
    #[tracing::instrument(level = "debug", skip(self), fields(id = self.id))]
    pub fn run_async_step(&mut self) -> Result<Vec<Replicate>, StorageError> {
        let leading = match self.leading.as_mut() {
            Some(leading) => leading,
            None => {
                tracing::trace!("not leading; nothing to step");
                return Ok(Vec::new());
            }
        };

        let commit = self.log.committed();
        let spear_head = self.log.spear_head();

        // (a) fan out the missing suffix per follower.
        let mut out = Vec::with_capacity(leading.followers.len());
        for (target, cursor) in leading.followers.iter_mut() {
            let prev_log_index = cursor.next_index - 1;
            // Compaction must not trim an unacknowledged suffix, so the term
            // at the cursor's predecessor is always still retained.
            let prev_log_term = self.log.term_of(prev_log_index).unwrap_or(0);

            let entries = self.log.entries_from(cursor.next_index);
            cursor.last_sent = entries.last().map(|e| e.log_id.index).unwrap_or(prev_log_index);

            out.push(Replicate {
                target: *target,
                request: AppendEntriesRequest {
                    leader_term: leading.term,
                    leader_id: self.id,
                    prev_log_term,
                    prev_log_index,
                    leader_commit: commit,
                    entries,
                },
            });
        }

        // (b) recompute the commit index from recorded acknowledgments. The
        // leader acknowledges its own spearhead.
        leading.progress.update(&self.id, spear_head);
        for (target, cursor) in leading.followers.iter() {
            if cursor.acked > 0 {
                leading.progress.update(target, cursor.acked);
            }
        }

        let quorum_commit = *leading.progress.committed();
        let committed = self.log.update_committed(quorum_commit);

        let to_apply = self.log.unapplied();
        if let Some(last) = to_apply.last() {
            let up_to = last.log_id.index;
            self.state_machine.apply(&to_apply)?;
            self.log.mark_applied(up_to);
        }

        if committed > 0 {
            let info = QuorumInfo {
                term: leading.term,
                index: committed,
                quorum: leading.progress.granted().into_iter().collect(),
            };
            leading.waiters.resolve_up_to(committed, &info);
        }

        tracing::debug!(committed, spear_head, "leader step done");
        Ok(out)
    }

    /// Record a follower's reply to the most recent request sent to it.
    ///
    /// Bookkeeping only: the commit index is recomputed at the next
    /// `run_async_step`. On rejection the cursor backs up by one index, so
    /// successive steps probe ever-earlier prefixes until the follower's log
    /// matches.
    #[tracing::instrument(
        level = "debug",
        skip(self, result),
        fields(id = self.id, success = result.success)
    )]
    pub fn handle_append_entries_result(
        &mut self,
        target: ParticipantId,
        result: AppendEntriesResult,
    ) -> Result<(), NotLeader> {
        let leading = match self.leading.as_mut() {
            Some(leading) => leading,
            None => return Err(NotLeader { id: self.id }),
        };

        if result.log_term > leading.term {
            tracing::warn!(
                follower_term = result.log_term,
                leader_term = leading.term,
                "follower serves a higher term; awaiting external leadership change"
            );
            return Ok(());
        }

        let cursor = match leading.followers.iter_mut().find(|(t, _)| *t == target) {
            Some((_, cursor)) => cursor,
            None => {
                tracing::warn!(target, "reply from a participant outside the follower set");
                return Ok(());
            }
        };

        if result.success {
            if cursor.last_sent > cursor.acked {
                cursor.acked = cursor.last_sent;
            }
            cursor.next_index = cursor.acked + 1;
        } else {
            cursor.next_index = std::cmp::max(1, cursor.next_index.saturating_sub(1));
            tracing::debug!(target, next_index = cursor.next_index, "append rejected; backing up");
        }

        Ok(())
    }
}
