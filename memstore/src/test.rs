use replog::testing::blank;
use replog::testing::entry;
use replog::PersistedLog;
use replog::StateMachine;

use crate::MemLogStore;
use crate::MemStateMachine;

#[test]
fn insert_and_read_from_any_index() -> anyhow::Result<()> {
    let mut store = MemLogStore::new();
    store.insert(vec![blank(1, 1), blank(1, 2), entry(2, 3, "x")])?;

    let all: Vec<_> = store.read(1)?.collect();
    assert_eq!(vec![blank(1, 1), blank(1, 2), entry(2, 3, "x")], all);

    // restartable from any starting index
    let tail: Vec<_> = store.read(3)?.collect();
    assert_eq!(vec![entry(2, 3, "x")], tail);

    let past_end: Vec<_> = store.read(7)?.collect();
    assert!(past_end.is_empty());
    Ok(())
}

#[test]
fn insert_replaces_an_existing_index() -> anyhow::Result<()> {
    let mut store = MemLogStore::new();
    store.insert(vec![blank(1, 1)])?;
    store.insert(vec![entry(2, 1, "replacement")])?;

    assert_eq!(1, store.len());
    let all: Vec<_> = store.read(1)?.collect();
    assert_eq!(vec![entry(2, 1, "replacement")], all);
    Ok(())
}

#[test]
fn remove_front_and_back_trim_by_index() -> anyhow::Result<()> {
    let mut store = MemLogStore::new();
    store.insert((1..=5).map(|i| blank(1, i)))?;

    store.remove_front(2)?;
    store.remove_back(4)?;

    let all: Vec<_> = store.read(1)?.collect();
    assert_eq!(vec![blank(1, 2), blank(1, 3)], all);

    store.drop_all()?;
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn injected_failure_hits_once() -> anyhow::Result<()> {
    let mut store = MemLogStore::new();
    store.fail_next();

    assert!(store.insert(vec![blank(1, 1)]).is_err());
    assert!(store.is_empty());

    // the failure is one-shot
    store.insert(vec![blank(1, 1)])?;
    assert_eq!(1, store.len());
    Ok(())
}

#[test]
fn state_machine_applies_in_order() -> anyhow::Result<()> {
    let mut sm = MemStateMachine::new();
    sm.apply(&[entry(1, 1, "a"), entry(1, 2, "b")])?;

    assert_eq!(2, sm.last_applied());
    assert_eq!(Some(&entry(1, 2, "b")), sm.get(2));
    Ok(())
}

#[test]
fn state_machine_refuses_gaps_and_duplicates() {
    let mut sm = MemStateMachine::new();
    sm.apply(&[entry(1, 1, "a")]).unwrap();

    // gap
    assert!(sm.apply(&[entry(1, 3, "c")]).is_err());
    // duplicate
    assert!(sm.apply(&[entry(1, 1, "a")]).is_err());

    assert_eq!(1, sm.last_applied());
}
