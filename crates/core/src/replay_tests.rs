// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

fn policy() -> ReplayPolicy {
    ReplayPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(350),
    }
}

#[parameterized(
    first = { 1, 100 },
    second = { 2, 200 },
    capped = { 3, 350 },
    far = { 40, 350 },
    zero = { 0, 100 },
)]
fn backoff_doubles_with_cap(attempts: u32, expected_ms: u64) {
    assert_eq!(policy().backoff(attempts), Duration::from_millis(expected_ms));
}

#[test]
fn success_advances() {
    assert_eq!(policy().judge(&ReplayOutcome::Succeeded, 0), Verdict::Advance);
}

#[test]
fn connectivity_stops_without_abandoning() {
    let verdict = policy().judge(&ReplayOutcome::connectivity("timeout"), 10);
    assert_eq!(verdict, Verdict::Stop);
}

#[test]
fn permanent_abandons_on_first_failure() {
    let verdict = policy().judge(&ReplayOutcome::permanent("meal not found"), 1);
    assert_eq!(verdict, Verdict::Abandon { reason: "meal not found".into(), report: true });
}

#[test]
fn transient_retries_until_ceiling() {
    let p = policy();
    let outcome = ReplayOutcome::transient("503");

    assert_eq!(p.judge(&outcome, 1), Verdict::RetryAfter(Duration::from_millis(100)));
    assert_eq!(p.judge(&outcome, 2), Verdict::RetryAfter(Duration::from_millis(200)));
    match p.judge(&outcome, 3) {
        Verdict::Abandon { reason, report } => {
            assert!(!report);
            assert!(reason.contains("3 attempts"));
            assert!(reason.contains("503"));
        }
        other => unreachable!("expected abandon, got {other:?}"),
    }
}

#[parameterized(
    succeeded = { ReplayOutcome::Succeeded, false },
    connectivity = { ReplayOutcome::connectivity("x"), false },
    transient = { ReplayOutcome::transient("x"), true },
    permanent = { ReplayOutcome::permanent("x"), true },
)]
fn attempts_counted_for_action_faults(outcome: ReplayOutcome, counts: bool) {
    assert_eq!(outcome.counts_as_attempt(), counts);
}

#[test]
fn session_walks_snapshot_in_order() {
    let mut session = ReplaySession::start(vec![ActionId(1), ActionId(2), ActionId(3)]);
    let mut seen = Vec::new();
    while let Some(id) = session.current(|_| true) {
        seen.push(id);
        session.advance();
    }
    assert_eq!(seen, vec![ActionId(1), ActionId(2), ActionId(3)]);
    assert!(session.remaining().is_empty());
}

#[test]
fn session_skips_removed_ids() {
    let mut session = ReplaySession::start(vec![ActionId(1), ActionId(2), ActionId(3)]);
    let queued = |id: ActionId| id != ActionId(2);

    assert_eq!(session.current(queued), Some(ActionId(1)));
    session.advance();
    assert_eq!(session.current(queued), Some(ActionId(3)));
}

#[test]
fn session_current_is_stable_until_advance() {
    let mut session = ReplaySession::start(vec![ActionId(4), ActionId(5)]);
    assert_eq!(session.current(|_| true), Some(ActionId(4)));
    assert_eq!(session.current(|_| true), Some(ActionId(4)));
    assert_eq!(session.remaining(), &[ActionId(4), ActionId(5)]);
}

#[test]
fn cancelled_session_starts_nothing_but_keeps_remaining() {
    let mut session = ReplaySession::start(vec![ActionId(1), ActionId(2)]);
    session.current(|_| true);
    session.advance();
    session.cancel();

    assert!(session.is_cancelled());
    assert_eq!(session.current(|_| true), None);
    assert_eq!(session.remaining(), &[ActionId(2)]);
    assert_eq!(session.snapshot().len(), 2);
}
