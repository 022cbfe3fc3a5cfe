//! Loop-only examples: completion, timeouts and failure reporting.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use evented_spec::{
    Bus, Event, EventKind, EventedExample, ExampleConfig, ExampleError, HarnessBuilder,
    HarnessConfig, HookPhase, HookRegistry,
};

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

fn with_timeout(ms: u64) -> ExampleConfig {
    ExampleConfig::default().with_timeout(Duration::from_millis(ms))
}

#[test]
fn synchronous_done_without_timeout_never_arms_a_timer() {
    let bus = Bus::new(64);
    let mut rx = bus.subscribe();

    EventedExample::loop_only(ExampleConfig::default(), HookRegistry::new(), |ctx| {
        ctx.done();
        assert_eq!(ctx.reactor().pending_timers(), 0);
        Ok(())
    })
    .with_bus(bus)
    .run()
    .unwrap();

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TimeoutArmed), 0);
    assert_eq!(count(&events, EventKind::ExamplePassed), 1);
}

#[test]
fn body_that_never_calls_done_times_out() {
    let timeout = Duration::from_millis(100);
    let started = Instant::now();

    let err = EventedExample::loop_only(with_timeout(100), HookRegistry::new(), |_ctx| Ok(()))
        .run()
        .unwrap_err();

    let elapsed = started.elapsed();
    assert!(err.is_timeout(), "{err:?}");
    assert!(err.to_string().contains("100ms"), "{err}");
    assert!(elapsed >= timeout, "fired early: {elapsed:?}");
    assert!(elapsed < timeout + Duration::from_millis(100), "fired late: {elapsed:?}");
}

#[test]
fn rearming_the_timeout_cancels_the_prior_timer() {
    let bus = Bus::new(64);
    let mut rx = bus.subscribe();
    let started = Instant::now();

    let err = EventedExample::loop_only(ExampleConfig::default(), HookRegistry::new(), |ctx| {
        ctx.timeout(Duration::from_millis(30));
        ctx.timeout(Duration::from_millis(80));
        Ok(())
    })
    .with_bus(bus)
    .run()
    .unwrap_err();

    assert!(matches!(
        err,
        ExampleError::Timeout { timeout } if timeout == Duration::from_millis(80)
    ));
    assert!(started.elapsed() >= Duration::from_millis(80));

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TimeoutArmed), 2);
    assert_eq!(count(&events, EventKind::TimeoutCancelled), 1);
    assert_eq!(count(&events, EventKind::TimeoutHit), 1);
}

#[test]
fn body_failure_is_reraised_after_after_loop_hooks() {
    let after = Arc::new(AtomicUsize::new(0));
    let a = Arc::clone(&after);
    let hooks = HookRegistry::new().with(HookPhase::AfterLoop, "count", move |_| {
        a.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let err = EventedExample::loop_only(with_timeout(1_000), hooks, |_ctx| {
        anyhow::bail!("expected 1, got 2")
    })
    .run()
    .unwrap_err();

    assert!(matches!(err, ExampleError::Body(_)));
    assert_eq!(err.to_string(), "expected 1, got 2");
    assert_eq!(after.load(Ordering::SeqCst), 1);
}

#[test]
fn timeout_beats_a_later_done() {
    let bus = Bus::new(64);
    let mut rx = bus.subscribe();
    let started = Instant::now();

    let err = EventedExample::loop_only(with_timeout(500), HookRegistry::new(), |ctx| {
        ctx.done_after(Duration::from_secs(1));
        Ok(())
    })
    .with_bus(bus)
    .run()
    .unwrap_err();

    let elapsed = started.elapsed();
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_secs(1), "waited for the late done: {elapsed:?}");

    let events = drain(&mut rx);
    let done: Vec<&Event> = events.iter().filter(|e| e.kind == EventKind::DoneRequested).collect();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].reason.as_deref(), Some("forced"));
}

#[test]
fn done_before_timeout_cancels_the_timer() {
    let bus = Bus::new(64);
    let mut rx = bus.subscribe();

    EventedExample::loop_only(with_timeout(1_000), HookRegistry::new(), |ctx| {
        ctx.done_after(Duration::from_millis(10));
        Ok(())
    })
    .with_bus(bus)
    .run()
    .unwrap();

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::TimeoutArmed), 1);
    assert_eq!(count(&events, EventKind::TimeoutCancelled), 1);
    assert_eq!(count(&events, EventKind::TimeoutHit), 0);
}

#[test]
fn harness_tallies_verdicts_across_examples() {
    let mut cfg = HarnessConfig::default();
    cfg.example = with_timeout(50);
    let harness = HarnessBuilder::new(cfg).build().unwrap();

    harness
        .run_loop("passes", |ctx| {
            ctx.done();
            Ok(())
        })
        .unwrap();
    let err = harness.run_loop("hangs", |_ctx| Ok(())).unwrap_err();
    assert!(err.is_timeout());
    harness
        .run_loop_with(ExampleConfig::default(), "no-timeout", |ctx| {
            ctx.done_after(Duration::from_millis(80));
            Ok(())
        })
        .unwrap();

    let tally = harness.tally();
    harness.shutdown().unwrap();

    assert_eq!(tally.passed(), vec!["no-timeout".to_string(), "passes".to_string()]);
    assert_eq!(tally.failed(), vec!["hangs".to_string()]);
    assert_eq!(tally.summary().running, 0);
}
