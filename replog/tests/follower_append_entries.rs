use pretty_assertions::assert_eq;
use replog_memstore::MemLogStore;
use replog_memstore::MemStateMachine;

use replog::error::NotFollower;
use replog::storage::PersistedLog;
use replog::testing::blank;
use replog::testing::entry;
use replog::AppendEntriesRequest;
use replog::AppendEntriesResult;
use replog::Entry;
use replog::LogFollower;
use replog::LogIndex;
use replog::LogStore;
use replog::Term;

fn follower(id: u64) -> LogFollower<MemLogStore, MemStateMachine> {
    seeded_follower(id, Vec::new())
}

/// A follower whose persisted log already holds `entries`, as after a restart.
fn seeded_follower(id: u64, entries: Vec<Entry>) -> LogFollower<MemLogStore, MemStateMachine> {
    let mut store = MemLogStore::new();
    store.insert(entries).unwrap();
    let log = LogStore::new(store).unwrap();
    LogFollower::new(id, log, MemStateMachine::new())
}

fn req(
    leader_term: Term,
    prev_log_term: Term,
    prev_log_index: LogIndex,
    leader_commit: LogIndex,
    entries: Vec<Entry>,
) -> AppendEntriesRequest {
    AppendEntriesRequest {
        leader_term,
        leader_id: 0,
        prev_log_term,
        prev_log_index,
        leader_commit,
        entries,
    }
}

#[test]
fn append_entries_before_become_follower_is_refused() {
    let mut f = follower(1);

    let res = f.append_entries(req(1, 0, 0, 0, vec![blank(1, 1)]));
    assert_eq!(Some(NotFollower { id: 1 }), res.err());
}

#[test]
fn appends_from_the_beginning_of_the_log() -> anyhow::Result<()> {
    let mut f = follower(1);
    f.become_follower(1, 0);

    let mut reply = f.append_entries(req(1, 0, 0, 0, vec![blank(1, 1), entry(1, 2, "b")]))?;
    assert_eq!(1, f.pending_append_entries());

    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::granted(1), reply.try_recv()?);
    assert_eq!(0, f.pending_append_entries());
    assert_eq!(2, f.statistics().spear_head);
    assert_eq!(Some(&entry(1, 2, "b")), f.entry(2));
    Ok(())
}

#[test]
fn stale_term_is_rejected_with_the_current_term() -> anyhow::Result<()> {
    let mut f = seeded_follower(1, vec![blank(1, 1)]);
    f.become_follower(3, 0);

    let mut reply = f.append_entries(req(2, 0, 1, 0, vec![blank(2, 2)]))?;
    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::rejected(3), reply.try_recv()?);
    assert_eq!(1, f.statistics().spear_head);
    assert_eq!(Some(3), f.current_term());
    Ok(())
}

#[test]
fn mismatched_previous_entry_is_rejected_without_mutation() -> anyhow::Result<()> {
    // local index 2 was written under term 2; the request claims term 1
    let mut f = seeded_follower(1, vec![blank(1, 1), blank(2, 2)]);
    f.become_follower(2, 0);

    let mut reply = f.append_entries(req(2, 1, 2, 0, vec![blank(2, 3)]))?;
    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::rejected(2), reply.try_recv()?);
    assert_eq!(2, f.statistics().spear_head);
    assert_eq!(Some(&blank(2, 2)), f.entry(2));
    Ok(())
}

#[test]
fn missing_previous_entry_is_rejected() -> anyhow::Result<()> {
    let mut f = seeded_follower(1, vec![blank(1, 1)]);
    f.become_follower(1, 0);

    // prev points past the local spearhead
    let mut reply = f.append_entries(req(1, 1, 5, 0, vec![blank(1, 6)]))?;
    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::rejected(1), reply.try_recv()?);
    assert_eq!(1, f.statistics().spear_head);
    Ok(())
}

#[test]
fn conflicting_suffix_is_truncated_and_replaced() -> anyhow::Result<()> {
    let mut f = seeded_follower(1, vec![blank(1, 1), blank(1, 2), blank(1, 3)]);
    f.become_follower(1, 0);

    // a new leader at term 2 overwrites everything after index 1
    let mut reply = f.append_entries(req(2, 1, 1, 0, vec![entry(2, 2, "x")]))?;
    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::granted(2), reply.try_recv()?);
    assert_eq!(2, f.statistics().spear_head);
    assert_eq!(Some(&entry(2, 2, "x")), f.entry(2));
    assert_eq!(None, f.entry(3));
    // the newer term was adopted from the request
    assert_eq!(Some(2), f.current_term());
    Ok(())
}

#[test]
fn redelivery_of_an_accepted_request_is_idempotent() -> anyhow::Result<()> {
    let mut f = follower(1);
    f.become_follower(1, 0);

    let request = req(1, 0, 0, 0, vec![blank(1, 1), entry(1, 2, "b")]);

    let mut first = f.append_entries(request.clone())?;
    f.run_async_append_entries()?;
    assert_eq!(AppendEntriesResult::granted(1), first.try_recv()?);

    let mut second = f.append_entries(request)?;
    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::granted(1), second.try_recv()?);
    assert_eq!(2, f.statistics().spear_head);
    assert_eq!(Some(&blank(1, 1)), f.entry(1));
    assert_eq!(Some(&entry(1, 2, "b")), f.entry(2));
    Ok(())
}

#[test]
fn commit_follows_the_leader_clamped_to_the_spearhead() -> anyhow::Result<()> {
    let mut f = follower(1);
    f.become_follower(1, 0);

    // the leader has committed further than this follower holds
    let mut reply = f.append_entries(req(1, 0, 0, 5, vec![blank(1, 1), blank(1, 2)]))?;
    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::granted(1), reply.try_recv()?);
    assert_eq!(2, f.statistics().commit_index);
    assert_eq!(2, f.state_machine().last_applied());
    Ok(())
}

#[test]
fn heartbeat_advances_the_commit_index() -> anyhow::Result<()> {
    let mut f = follower(1);
    f.become_follower(1, 0);

    let _ = f.append_entries(req(1, 0, 0, 0, vec![blank(1, 1), blank(1, 2)]))?;
    f.run_async_append_entries()?;
    assert_eq!(0, f.statistics().commit_index);

    // an empty request still carries the leader's commit index
    let mut reply = f.append_entries(req(1, 1, 2, 2, vec![]))?;
    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::granted(1), reply.try_recv()?);
    assert_eq!(2, f.statistics().commit_index);
    assert_eq!(2, f.state_machine().last_applied());
    Ok(())
}

#[test]
fn queued_requests_are_served_in_arrival_order() -> anyhow::Result<()> {
    let mut f = follower(1);
    f.become_follower(1, 0);

    let mut r1 = f.append_entries(req(1, 0, 0, 0, vec![blank(1, 1)]))?;
    let mut r2 = f.append_entries(req(1, 1, 1, 1, vec![blank(1, 2)]))?;
    assert_eq!(2, f.pending_append_entries());

    f.run_async_append_entries()?;

    assert_eq!(AppendEntriesResult::granted(1), r1.try_recv()?);
    assert_eq!(AppendEntriesResult::granted(1), r2.try_recv()?);
    assert_eq!(2, f.statistics().spear_head);
    assert_eq!(1, f.statistics().commit_index);
    Ok(())
}

#[test]
fn stale_become_follower_keeps_the_current_term() {
    let mut f = follower(1);
    f.become_follower(3, 0);
    f.become_follower(2, 9);

    assert_eq!(Some(3), f.current_term());
    assert_eq!(Some(0), f.leader());
}

#[test]
fn storage_failure_leaves_the_reply_unresolved() -> anyhow::Result<()> {
    let mut store = MemLogStore::new();
    store.insert(vec![blank(1, 1), blank(1, 2)])?;
    // the next mutation — the truncation triggered by the conflicting
    // entry — will fail; wrapping the store only reads
    store.fail_next();
    let log = LogStore::new(store)?;
    let mut f = LogFollower::new(1, log, MemStateMachine::new());
    f.become_follower(2, 0);

    let mut reply = f.append_entries(req(2, 1, 1, 0, vec![entry(2, 2, "x")]))?;

    assert!(f.run_async_append_entries().is_err());
    assert!(reply.try_recv().is_err());
    Ok(())
}
