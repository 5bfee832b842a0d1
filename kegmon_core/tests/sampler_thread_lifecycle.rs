//! Sampler thread lifecycle: events flow while running, the thread exits on
//! drop, and the manager can be taken back after `stop()`.

use std::time::{Duration, Instant};

use kegmon_core::mocks::{ConstantSource, ScriptedSource};
use kegmon_core::sampler::Sampler;
use kegmon_core::{ChangeDetection, ChangeEvent, ChangeState, Channel, DetectionCfg, FilterParams, MonitorHandle};
use kegmon_traits::clock::MonotonicClock;
use kegmon_traits::clock::test_clock::TestClock;

fn manager(clock: &TestClock) -> ChangeDetection {
    ChangeDetection::builder()
        .with_detection(DetectionCfg {
            stabilization_ms: 1000,
            ..DetectionCfg::default()
        })
        .with_clock(Box::new(clock.clone()))
        .try_build()
        .expect("valid config")
}

/// Drain events until `done` matches one or the real-time deadline passes.
fn collect_until(h: &MonitorHandle, done: impl Fn(&ChangeEvent) -> bool) -> Vec<ChangeEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut out = Vec::new();
    while Instant::now() < deadline {
        match h.next_event() {
            Some(e) => {
                let stop = done(&e);
                out.push(e);
                if stop {
                    break;
                }
            }
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    out
}

#[test]
fn sampler_drives_the_manager() {
    let clock = TestClock::new();
    let source = ScriptedSource::new()
        .with_script(Channel::U1, [Some(5.0)])
        .with_script(Channel::U2, [None]);
    let sampler = Sampler::spawn(
        source,
        &FilterParams::default(),
        manager(&clock),
        10,
        Duration::from_millis(50),
        clock.clone(),
    );
    let h = sampler.handle();

    let events = collect_until(&h, |e| e.kind.name() == "stable_detected");
    let names: Vec<(Channel, &str)> = events.iter().map(|e| (e.channel, e.kind.name())).collect();
    assert!(names.contains(&(Channel::U1, "startup")), "{names:?}");
    assert!(names.contains(&(Channel::U2, "invalid_weight")), "{names:?}");
    assert_eq!(names.last(), Some(&(Channel::U1, "stable_detected")));

    assert!(sampler.latest().is_some());
    let m = sampler.stop().expect("manager returned");
    assert_eq!(m.state(Channel::U1), ChangeState::Stable);
    assert_eq!(m.stable_weight(Channel::U1), 5.0);
    assert_eq!(m.state(Channel::U2), ChangeState::InvalidWeight);
    // Nothing scripted on U3: never read.
    assert_eq!(m.state(Channel::U3), ChangeState::Idle);
    assert_eq!(m.sample_statistics(Channel::U3).total_readings, 0);
    assert!(m.sample_statistics(Channel::U2).invalid_readings > 0);
}

#[test]
fn failing_source_shows_as_stall() {
    let clock = TestClock::new();
    let source = ScriptedSource::new().with_script(Channel::U4, [None]);
    let sampler = Sampler::spawn(
        source,
        &FilterParams::default(),
        manager(&clock),
        10,
        Duration::from_millis(50),
        clock.clone(),
    );
    let h = sampler.handle();
    let _ = collect_until(&h, |e| e.kind.name() == "invalid_weight");
    let now = clock.elapsed_ms();
    assert_eq!(sampler.stalled_for(now), now);
}

#[test]
fn sampler_thread_exits_on_drop() {
    let m = ChangeDetection::builder().try_build().expect("defaults");
    let sampler = Sampler::spawn(
        ConstantSource(12.0),
        &FilterParams::default(),
        m,
        100,
        Duration::from_millis(10),
        MonotonicClock::new(),
    );
    std::thread::sleep(Duration::from_millis(30));
    drop(sampler);
}

#[test]
fn multiple_samplers_dont_leak_threads() {
    for _ in 0..10 {
        let m = ChangeDetection::builder().try_build().expect("defaults");
        let sampler = Sampler::spawn(
            ConstantSource(8.0),
            &FilterParams::default(),
            m,
            50,
            Duration::from_millis(10),
            MonotonicClock::new(),
        );
        std::thread::sleep(Duration::from_millis(5));
        let _ = sampler.latest();
        drop(sampler);
    }
}
