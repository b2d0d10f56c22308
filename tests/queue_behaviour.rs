// tests/queue_behaviour.rs

use gantry::engine::{RetriggerPolicy, TriggerQueue};

#[test]
fn queue_policy_merges_triggers_into_single_batch() {
    let mut q = TriggerQueue::new(RetriggerPolicy::Queue, 2);

    q.record_trigger("css");
    q.record_trigger("js");
    q.record_trigger("css");

    let mut items = q.drain_pending();
    items.sort();
    assert_eq!(items, vec!["css".to_string(), "js".to_string()]);
    assert!(q.is_empty());
}

#[test]
fn cancel_policy_keeps_only_latest_trigger() {
    let mut q = TriggerQueue::new(RetriggerPolicy::Cancel, 3);

    q.record_trigger("css");
    q.record_trigger("js");

    let items = q.drain_pending();
    assert_eq!(items, vec!["js".to_string()]);
}

#[test]
fn zero_length_backlog_is_clamped_to_one() {
    let mut q = TriggerQueue::new(RetriggerPolicy::Queue, 0);

    q.record_trigger("css");
    assert!(!q.is_empty());
    assert_eq!(q.drain_pending(), vec!["css".to_string()]);
}

#[test]
fn drain_on_empty_backlog_returns_nothing() {
    let mut q = TriggerQueue::new(RetriggerPolicy::Queue, 1);
    assert!(q.is_empty());
    assert!(q.drain_pending().is_empty());
}
