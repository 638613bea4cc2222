//! End-to-end behavior of the admission gate under realistic call patterns.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use turnstile::{Decision, GateRegistry, InMemoryGateRegistry, ManualClock, NoJitter, RequestGate};

const CAP_MS: u64 = 30 * 60 * 1_000;
const DAY_MS: u64 = 24 * 60 * 60 * 1_000;

fn deterministic_gate() -> (RequestGate, ManualClock) {
    let clock = ManualClock::new();
    let gate = RequestGate::new().with_clock(clock.clone()).with_jitter(NoJitter);
    (gate, clock)
}

#[test]
fn outage_recovery_lifecycle() {
    let (gate, clock) = deterministic_gate();

    // Service goes down: three failed polls, each waited out.
    for k in 1u64..=3 {
        assert!(gate.is_request_allowed());
        gate.record_response(503);
        assert!(!gate.is_request_allowed());
        clock.advance((1 << k) + 1);
    }

    // Service recovers: the probe succeeds and the schedule clears.
    assert!(gate.is_request_allowed());
    gate.record_response(200);
    assert!(gate.is_request_allowed());
    assert_eq!(gate.snapshot().attempts, 0);
}

#[test]
fn misconfigured_client_goes_silent_for_a_day() {
    let (gate, clock) = deterministic_gate();
    clock.set(5_000);

    gate.record_response(403);
    match gate.check() {
        Decision::Denied { wait, attempts } => {
            assert_eq!(wait, Some(Duration::from_millis(DAY_MS)));
            assert_eq!(attempts, 1);
        }
        Decision::Allowed => panic!("expected a day of silence"),
    }

    // Half a day in: still silent.
    clock.advance(DAY_MS / 2);
    assert!(!gate.is_request_allowed());

    // Past the deadline: one probe, which succeeds this time.
    clock.advance(DAY_MS / 2 + 1);
    assert!(gate.is_request_allowed());
    gate.record_response(200);
    assert!(gate.is_request_allowed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_lose_no_updates() {
    const TASKS: u32 = 32;

    let (gate, _clock) = deterministic_gate();
    let barrier = Arc::new(tokio::sync::Barrier::new(TASKS as usize));

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let g = gate.clone();
            let b = barrier.clone();
            tokio::spawn(async move {
                b.wait().await;
                g.record_response(500);
            })
        })
        .collect();
    join_all(handles).await;

    assert_eq!(gate.snapshot().attempts, TASKS, "every failure must be counted");

    // The deadline reflects a window computed from one of the racing counts.
    match gate.check() {
        Decision::Denied { wait: Some(wait), attempts } => {
            assert_eq!(attempts, TASKS);
            let wait_ms = u64::try_from(wait.as_millis()).unwrap();
            let valid = (1..=TASKS).any(|k| wait_ms == (1u64 << k.min(63)).min(CAP_MS));
            assert!(valid, "wait {}ms is not a backoff for any count in 1..={}", wait_ms, TASKS);
        }
        other => panic!("expected a denial with a deadline, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn checks_racing_recordings_keep_the_count_exact() {
    const FAILURES: u32 = 16;
    const CHECKERS: u32 = 16;

    let (gate, _clock) = deterministic_gate();
    let barrier = Arc::new(tokio::sync::Barrier::new((FAILURES + CHECKERS) as usize));

    let mut handles = Vec::new();
    for _ in 0..FAILURES {
        let g = gate.clone();
        let b = barrier.clone();
        handles.push(tokio::spawn(async move {
            b.wait().await;
            g.record_response(502);
        }));
    }
    for _ in 0..CHECKERS {
        let g = gate.clone();
        let b = barrier.clone();
        handles.push(tokio::spawn(async move {
            b.wait().await;
            let _ = g.is_request_allowed();
        }));
    }
    join_all(handles).await;

    // Checks never mutate the count; all windows were in the future, so none
    // of them cleared a deadline either.
    let snapshot = gate.snapshot();
    assert_eq!(snapshot.attempts, FAILURES);
    assert!(snapshot.in_backoff);
}

#[tokio::test]
async fn execute_drives_the_full_cycle() {
    let (gate, clock) = deterministic_gate();

    // First call fails.
    let body = gate.execute(|| async { (500u16, "unavailable") }).await.unwrap();
    assert_eq!(body, "unavailable");

    // Second call is refused without reaching the network.
    let denied = gate.execute(|| async { (200u16, "unreachable") }).await.unwrap_err();
    assert_eq!(denied.attempts, 1);
    assert_eq!(denied.wait, Some(Duration::from_millis(2)));

    // Wait out the window; the probe succeeds and the gate reopens fully.
    clock.advance(3);
    let body = gate.execute(|| async { (200u16, "registered") }).await.unwrap();
    assert_eq!(body, "registered");
    assert!(gate.is_request_allowed());
}

#[test]
fn registry_keeps_endpoint_schedules_independent() {
    let registry = InMemoryGateRegistry::default();
    let (installations, _clock) = deterministic_gate();
    let (tokens, _clock) = deterministic_gate();
    registry.register("installations".into(), installations);
    registry.register("tokens".into(), tokens);

    registry.get("installations").unwrap().record_response(400);

    assert!(!registry.get("installations").unwrap().is_request_allowed());
    assert!(registry.get("tokens").unwrap().is_request_allowed());

    registry.reset("installations").unwrap();
    assert!(registry.get("installations").unwrap().is_request_allowed());
}
