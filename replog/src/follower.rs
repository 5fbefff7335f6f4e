//! The passive replica role: validates and applies `AppendEntries` requests
//! from the leader.

use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::error::NotFollower;
use crate::log_store::LogStore;
use crate::log_store::Statistics;
use crate::storage::PersistedLog;
use crate::storage::StateMachine;
use crate::AppendEntriesRequest;
use crate::AppendEntriesResult;
use crate::Entry;
use crate::LogIndex;
use crate::ParticipantId;
use crate::StorageError;
use crate::Term;

/// A suspended reply to `append_entries`, resolved by the follower's next
/// `run_async_append_entries` call.
///
/// A storage failure while serving the request drops the sender instead of
/// resolving it; the caller observes a closed channel.
pub type AppendEntriesReply = oneshot::Receiver<AppendEntriesResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Following {
    term: Term,
    leader_id: ParticipantId,
}

/// The passive replica role for one logical log.
///
/// Requests are queued by `append_entries` and served, in arrival order, by
/// the next `run_async_append_entries` call — the follower's explicit
/// scheduling point. Nothing happens in between, in production or in tests.
pub struct LogFollower<S: PersistedLog, SM: StateMachine> {
    id: ParticipantId,
    log: LogStore<S>,
    state_machine: SM,
    following: Option<Following>,
    inbox: VecDeque<(AppendEntriesRequest, oneshot::Sender<AppendEntriesResult>)>,
}

impl<S: PersistedLog, SM: StateMachine> LogFollower<S, SM> {
    pub fn new(id: ParticipantId, log: LogStore<S>, state_machine: SM) -> Self {
        Self {
            id,
            log,
            state_machine,
            following: None,
            inbox: VecDeque::new(),
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// The term this instance is following under, if any.
    pub fn current_term(&self) -> Option<Term> {
        self.following.as_ref().map(|f| f.term)
    }

    pub fn leader(&self) -> Option<ParticipantId> {
        self.following.as_ref().map(|f| f.leader_id)
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

    /// Requests accepted but not yet served.
    pub fn pending_append_entries(&self) -> usize {
        self.inbox.len()
    }

    /// Adopt (or re-adopt) the follower role.
    ///
    /// May be called repeatedly to follow a new leader or a higher term;
    /// adopting a term never discards persisted data. A term lower than the
    /// current one is ignored: it can only come from a stale external
    /// leadership decision.
    #[tracing::instrument(level = "debug", skip(self), fields(id = self.id))]
    pub fn become_follower(&mut self, term: Term, leader_id: ParticipantId) {
        match &self.following {
            Some(f) if term < f.term => {
                tracing::warn!(current = f.term, requested = term, "ignoring stale become_follower");
            }
            _ => {
                tracing::info!(term, leader_id, "now following");
                self.following = Some(Following { term, leader_id });
            }
        }
    }

    /// Accept a replication request from the leader.
    ///
    /// The request is only queued; validation and persistence happen at the
    /// next `run_async_append_entries`, which resolves the returned reply.
    pub fn append_entries(
        &mut self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesReply, NotFollower> {
        if self.following.is_none() {
            return Err(NotFollower { id: self.id });
        }

        let (tx, rx) = oneshot::channel();
        self.inbox.push_back((request, tx));
        Ok(rx)
    }

    /// The follower's single scheduling point: serve every queued request in
    /// arrival order and resolve its reply.
    #[tracing::instrument(level = "debug", skip(self), fields(id = self.id))]
    pub fn run_async_append_entries(&mut self) -> Result<(), StorageError> {
        while let Some((request, tx)) = self.inbox.pop_front() {
            let result = self.process(request)?;
            // A dropped receiver is a caller that stopped waiting.
            let _ = tx.send(result);
        }
        Ok(())
    }

    fn process(&mut self, request: AppendEntriesRequest) -> Result<AppendEntriesResult, StorageError> {
        let following = match self.following {
            Some(f) => f,
            // Unreachable through the public API: `append_entries` refuses
            // to enqueue before `become_follower`.
            None => return Ok(AppendEntriesResult::rejected(0)),
        };

        // A stale leader gets told the current term and changes nothing.
        if request.leader_term < following.term {
            tracing::debug!(
                request_term = request.leader_term,
                current_term = following.term,
                "rejecting append-entries from a stale term"
            );
            return Ok(AppendEntriesResult::rejected(following.term));
        }

        // A request from a newer term (or a new leader of the same term)
        // carries the external leadership decision inline; adopt it.
        if request.leader_term > following.term || request.leader_id != following.leader_id {
            self.following = Some(Following {
                term: request.leader_term,
                leader_id: request.leader_id,
            });
        }
        let current_term = request.leader_term;

        // Consistency precondition: the request either starts at the very
        // beginning, or continues an entry this follower already holds.
        let precondition_holds = request.prev_log_index == 0
            || self.log.term_of(request.prev_log_index) == Some(request.prev_log_term);
        if !precondition_holds {
            tracing::debug!(
                prev_log_index = request.prev_log_index,
                prev_log_term = request.prev_log_term,
                spear_head = self.log.spear_head(),
                "log consistency mismatch; rejecting without mutation"
            );
            return Ok(AppendEntriesResult::rejected(current_term));
        }

        // Skip entries that already match; at the first conflict, drop the
        // local suffix and take everything the request carries from there.
        let mut past_local = false;
        let mut to_append = Vec::new();
        for entry in request.entries {
            if !past_local {
                match self.log.term_of(entry.log_id.index) {
                    Some(local_term) if local_term == entry.log_id.term => continue,
                    Some(_) => {
                        self.log.truncate_back(entry.log_id.index)?;
                        past_local = true;
                    }
                    None => {
                        past_local = true;
                    }
                }
            }
            to_append.push(entry);
        }
        self.log.append(to_append)?;

        // The commit cursor follows the leader, clamped to what is present
        // locally; newly committed entries go to the state machine in order.
        self.log.update_committed(request.leader_commit);
        let to_apply = self.log.unapplied();
        if let Some(last) = to_apply.last() {
            let up_to = last.log_id.index;
            self.state_machine.apply(&to_apply)?;
            self.log.mark_applied(up_to);
        }

        tracing::debug!(statistics = %self.log.statistics(), "append-entries accepted");
        Ok(AppendEntriesResult::granted(current_term))
    }
}
