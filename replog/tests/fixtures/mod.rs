//! Fixtures driving a leader and a set of followers by explicit steps,
//! with the test body standing in for the transport collaborator.

#![allow(dead_code)]

use std::collections::BTreeMap;

use replog::LogFollower;
use replog::LogLeader;
use replog::LogStore;
use replog::ParticipantId;
use replog::Replicate;
use replog::Term;
use replog::WriteConcern;
use replog_memstore::MemLogStore;
use replog_memstore::MemStateMachine;

pub type Leader = LogLeader<MemLogStore, MemStateMachine>;
pub type Follower = LogFollower<MemLogStore, MemStateMachine>;

/// Initialize tracing once per test binary; `RUST_LOG` controls the filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn new_leader(id: ParticipantId) -> Leader {
    let log = LogStore::new(MemLogStore::new()).unwrap();
    LogLeader::new(id, log, MemStateMachine::new())
}

pub fn new_follower(id: ParticipantId) -> Follower {
    let log = LogStore::new(MemLogStore::new()).unwrap();
    LogFollower::new(id, log, MemStateMachine::new())
}

/// One leader plus its follower set, wired back-to-back without a network.
pub struct Cluster {
    pub leader: Leader,
    pub followers: BTreeMap<ParticipantId, Follower>,
}

impl Cluster {
    pub fn new(
        leader_id: ParticipantId,
        follower_ids: &[ParticipantId],
        term: Term,
        write_concern: WriteConcern,
    ) -> Self {
        init_tracing();

        let mut leader = new_leader(leader_id);
        leader.become_leader(term, follower_ids.to_vec(), write_concern);

        let mut followers = BTreeMap::new();
        for id in follower_ids {
            let mut follower = new_follower(*id);
            follower.become_follower(term, leader_id);
            followers.insert(*id, follower);
        }

        Self { leader, followers }
    }

    /// One full replication round: leader step, delivery to every follower,
    /// follower steps, replies fed back, and a closing leader step so the
    /// commit index reflects the round's acknowledgments.
    pub async fn replicate_round(&mut self) -> anyhow::Result<()> {
        self.half_round().await?;
        self.leader.run_async_step()?;
        Ok(())
    }

    /// Leader step plus delivery and replies, without the closing step:
    /// acknowledgments are recorded but not yet folded into the commit index.
    pub async fn half_round(&mut self) -> anyhow::Result<()> {
        let requests = self.leader.run_async_step()?;
        for Replicate { target, request } in requests {
            let follower = match self.followers.get_mut(&target) {
                Some(follower) => follower,
                // an unreachable follower simply never replies
                None => continue,
            };
            let reply = follower.append_entries(request)?;
            follower.run_async_append_entries()?;
            let result = reply.await?;
            self.leader.handle_append_entries_result(target, result)?;
        }
        Ok(())
    }

    /// Leader step with all requests dropped on the floor, simulating a
    /// partition between the leader and every follower.
    pub fn partitioned_step(&mut self) -> anyhow::Result<()> {
        let _ = self.leader.run_async_step()?;
        Ok(())
    }
}
