//! Broker-session examples: session handshakes, forced cleanup and idempotence.

use std::sync::Arc;
use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use evented_spec::{
    Broker, BrokerError, Bus, CloseMode, ConnectMode, Event, EventKind, EventedExample,
    ExampleConfig, ExampleError, HarnessBuilder, HarnessConfig, HookPhase, HookRegistry,
    LoopbackBroker,
};

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn position(events: &[Event], pred: impl Fn(&Event) -> bool) -> usize {
    events
        .iter()
        .position(pred)
        .unwrap_or_else(|| panic!("event missing from {:?}", kinds(events)))
}

fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

fn counting_hook(
    hooks: HookRegistry,
    phase: HookPhase,
    counter: &Arc<AtomicUsize>,
) -> HookRegistry {
    let c = Arc::clone(counter);
    hooks.with(phase, phase.as_str(), move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn normal_session_closes_before_the_loop_stops() {
    let broker = Arc::new(LoopbackBroker::new());
    let bus = Bus::new(128);
    let mut rx = bus.subscribe();
    let before = Arc::new(AtomicUsize::new(0));
    let hooks = counting_hook(HookRegistry::new(), HookPhase::BrokerBefore, &before);

    let b = Arc::clone(&broker);
    EventedExample::broker_session(ExampleConfig::default(), hooks, broker.clone(), move |ctx| {
        assert!(b.is_connected());
        ctx.done();
        Ok(())
    })
    .with_bus(bus)
    .run()
    .unwrap();

    let events = drain(&mut rx);
    let hooks_ran = position(&events, |e| {
        e.kind == EventKind::HooksRan && e.phase == Some(HookPhase::BrokerAfter)
    });
    let close_acked = position(&events, |e| e.kind == EventKind::SessionClosed);
    let loop_stopped = position(&events, |e| e.kind == EventKind::LoopStopped);
    let reset = position(&events, |e| e.kind == EventKind::BrokerStateReset);
    assert!(hooks_ran < close_acked, "{:?}", kinds(&events));
    assert!(close_acked < loop_stopped, "{:?}", kinds(&events));
    assert!(loop_stopped < reset, "{:?}", kinds(&events));
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::ExamplePassed));

    let stats = broker.stats();
    assert_eq!((stats.connects, stats.closes, stats.acks, stats.resets), (1, 1, 1, 1));
    assert_eq!(before.load(Ordering::SeqCst), 1);
    assert!(broker.is_idle());
}

#[test]
fn silent_broker_with_watchdog_done_cleans_up_once() {
    let broker = Arc::new(LoopbackBroker::new().with_connect_mode(ConnectMode::Silent));
    let body_ran = Arc::new(AtomicBool::new(false));
    let after = Arc::new(AtomicUsize::new(0));
    let hooks = counting_hook(HookRegistry::new(), HookPhase::AfterLoop, &after).with(
        HookPhase::BeforeLoop,
        "watchdog",
        |ctx| {
            ctx.done_after(Duration::from_millis(30));
            Ok(())
        },
    );

    let flag = Arc::clone(&body_ran);
    EventedExample::broker_session(ExampleConfig::default(), hooks, broker.clone(), move |ctx| {
        flag.store(true, Ordering::SeqCst);
        ctx.done();
        Ok(())
    })
    .run()
    .unwrap();

    assert!(!body_ran.load(Ordering::SeqCst));
    assert_eq!(after.load(Ordering::SeqCst), 1);
    let stats = broker.stats();
    assert_eq!((stats.connects, stats.opened, stats.closes, stats.resets), (1, 0, 0, 1));
}

#[test]
fn silent_broker_times_out_without_double_cleanup() {
    let broker = Arc::new(LoopbackBroker::new().with_connect_mode(ConnectMode::Silent));
    let bus = Bus::new(128);
    let mut rx = bus.subscribe();
    let cfg = ExampleConfig::default().with_timeout(Duration::from_millis(50));

    let err = EventedExample::broker_session(cfg, HookRegistry::new(), broker.clone(), |ctx| {
        ctx.done();
        Ok(())
    })
    .with_bus(bus)
    .run()
    .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(broker.stats().resets, 1);
    let events = drain(&mut rx);
    assert_eq!(events.iter().filter(|e| e.kind == EventKind::BrokerStateReset).count(), 1);
    assert_eq!(events.iter().filter(|e| e.kind == EventKind::FailureSuppressed).count(), 0);
}

#[test]
fn refused_connection_fails_the_example() {
    let broker = Arc::new(LoopbackBroker::new().with_connect_mode(ConnectMode::Refuse));
    let after = Arc::new(AtomicUsize::new(0));
    let hooks = counting_hook(HookRegistry::new(), HookPhase::AfterLoop, &after);

    let cfg = ExampleConfig::default();
    let err = EventedExample::broker_session(cfg, hooks, broker.clone(), |ctx| {
        ctx.done();
        Ok(())
    })
    .run()
    .unwrap_err();

    match err {
        ExampleError::Broker(BrokerError::Refused { endpoint }) => {
            assert_eq!(endpoint, "127.0.0.1:5672/")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(after.load(Ordering::SeqCst), 1);
    assert_eq!(broker.stats().resets, 1);
}

#[test]
fn hanging_close_is_forced_by_the_timeout() {
    let broker = Arc::new(LoopbackBroker::new().with_close_mode(CloseMode::Hang));
    let broker_after = Arc::new(AtomicUsize::new(0));
    let hooks = counting_hook(HookRegistry::new(), HookPhase::BrokerAfter, &broker_after);
    let cfg = ExampleConfig::default().with_timeout(Duration::from_millis(60));

    let err = EventedExample::broker_session(cfg, hooks, broker.clone(), |ctx| {
        ctx.done();
        Ok(())
    })
    .run()
    .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(broker_after.load(Ordering::SeqCst), 1);
    let stats = broker.stats();
    assert_eq!((stats.closes, stats.acks, stats.resets), (1, 0, 1));
    assert!(broker.is_idle());
}

#[test]
fn timeout_on_an_open_session_skips_the_close_handshake() {
    let broker = Arc::new(LoopbackBroker::new().with_close_mode(CloseMode::Hang));
    let broker_after = Arc::new(AtomicUsize::new(0));
    let hooks = counting_hook(HookRegistry::new(), HookPhase::BrokerAfter, &broker_after);
    let cfg = ExampleConfig::default().with_timeout(Duration::from_millis(50));

    let (tx, rx) = mpsc::channel();
    let example = EventedExample::broker_session(cfg, hooks, broker.clone(), |_ctx| Ok(()));
    std::thread::spawn(move || {
        let started = Instant::now();
        let res = example.run();
        let _ = tx.send((res, started.elapsed()));
    });

    let (res, elapsed) = rx
        .recv_timeout(Duration::from_secs(3))
        .expect("run() must return after the example timeout");
    assert!(res.unwrap_err().is_timeout());
    assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");

    assert_eq!(broker_after.load(Ordering::SeqCst), 1);
    let stats = broker.stats();
    assert_eq!((stats.opened, stats.closes, stats.resets), (1, 0, 1));
    assert!(broker.is_idle());
}

#[test]
fn slow_close_is_not_awaited_after_the_timeout() {
    let broker = Arc::new(LoopbackBroker::new().with_close_latency(Duration::from_millis(800)));
    let cfg = ExampleConfig::default().with_timeout(Duration::from_millis(50));
    let started = Instant::now();

    let hooks = HookRegistry::new();
    let err = EventedExample::broker_session(cfg, hooks, broker.clone(), |_ctx| Ok(()))
        .run()
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_millis(400), "took {:?}", started.elapsed());
    assert_eq!(broker.stats().acks, 0);
    assert_eq!(broker.stats().resets, 1);
}

#[test]
fn failing_cleanup_never_shadows_the_body_failure() {
    let broker = Arc::new(LoopbackBroker::new().with_failing_reset());
    let bus = Bus::new(128);
    let mut rx = bus.subscribe();

    let err = EventedExample::broker_session(
        ExampleConfig::default(),
        HookRegistry::new(),
        broker.clone(),
        |_ctx| anyhow::bail!("message never arrived"),
    )
    .with_bus(bus)
    .run()
    .unwrap_err();

    assert_eq!(err.to_string(), "message never arrived");
    let events = drain(&mut rx);
    let suppressed: Vec<&Event> =
        events.iter().filter(|e| e.kind == EventKind::FailureSuppressed).collect();
    assert_eq!(suppressed.len(), 1);
    assert_eq!(suppressed[0].label, Some("example_broker_failed"));
}

#[test]
fn failing_cleanup_alone_fails_the_example() {
    let broker = Arc::new(LoopbackBroker::new().with_failing_reset());

    let cfg = ExampleConfig::default();
    let err = EventedExample::broker_session(cfg, HookRegistry::new(), broker.clone(), |ctx| {
        ctx.done();
        Ok(())
    })
    .run()
    .unwrap_err();

    assert!(matches!(err, ExampleError::Broker(BrokerError::Reset { .. })));
}

#[test]
fn harness_shares_one_broker_across_examples() {
    let broker = Arc::new(LoopbackBroker::new());
    let harness = HarnessBuilder::new(HarnessConfig::default())
        .with_broker(broker.clone())
        .build()
        .unwrap();

    for name in ["first", "second"] {
        harness
            .run_broker(name, |ctx| {
                ctx.done_after(Duration::from_millis(5));
                Ok(())
            })
            .unwrap();
        assert!(broker.is_idle());
    }

    let tally = harness.tally();
    harness.shutdown().unwrap();

    let stats = broker.stats();
    assert_eq!((stats.connects, stats.opened, stats.resets), (2, 2, 2));
    assert_eq!(tally.summary().passed, 2);
}
