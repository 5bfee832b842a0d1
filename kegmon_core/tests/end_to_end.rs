//! Whole-manager scenarios driven with hand-made filtered readings.

use kegmon_core::{
    ChangeDetection, ChangeEvent, ChangeState, Channel, ChannelCfg, DetectionCfg, EVENT_QUEUE_CAPACITY, EventKind,
    FilterKind, FilteredReading, PourDetails,
};
use kegmon_traits::clock::test_clock::TestClock;
use rstest::{fixture, rstest};

fn manager_with_glass(glass_volume_l: f32) -> ChangeDetection {
    ChangeDetection::builder()
        .with_detection(DetectionCfg {
            stability_filter: FilterKind::Raw,
            pour_filter: FilterKind::Raw,
            stabilization_ms: 2000,
            pour_ms: 2000,
            ..DetectionCfg::default()
        })
        .with_channel(
            Channel::U1,
            ChannelCfg {
                glass_volume_l,
                ..ChannelCfg::default()
            },
        )
        .with_clock(Box::new(TestClock::new()))
        .try_build()
        .expect("valid config")
}

#[fixture]
fn manager() -> ChangeDetection {
    manager_with_glass(1.0)
}

fn feed(m: &mut ChangeDetection, samples: &[(u64, f32)]) {
    for &(ts, kg) in samples {
        m.update(Channel::U1, &FilteredReading::uniform(kg), ts);
    }
}

fn drain(m: &ChangeDetection) -> Vec<ChangeEvent> {
    std::iter::from_fn(|| m.get_next_event()).collect()
}

/// Settles at 5.0 kg, then pours down to 4.5 kg; ends in Restabilizing at t=6000.
const SETTLE_AND_POUR: [(u64, f32); 7] = [
    (0, 5.0),
    (1000, 5.0),
    (2000, 5.0),
    (3000, 5.0),
    (4000, 4.75),
    (5000, 4.5),
    (6000, 4.5),
];

#[rstest]
fn settle_pour_and_restabilize(mut manager: ChangeDetection) {
    feed(&mut manager, &SETTLE_AND_POUR);
    assert_eq!(manager.state(Channel::U1), ChangeState::Restabilizing);
    feed(&mut manager, &[(7000, 4.5), (8000, 4.5)]);
    assert_eq!(manager.state(Channel::U1), ChangeState::Stable);

    let events = drain(&manager);
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.name()).collect();
    assert_eq!(
        kinds,
        ["stable_detected", "pour_started", "pour_completed", "stable_detected"]
    );

    match events[0].kind {
        EventKind::StableDetected {
            stable_weight_kg,
            duration_ms,
            ..
        } => {
            assert_eq!(stable_weight_kg, 5.0);
            assert_eq!(duration_ms, 2000);
        }
        other => panic!("unexpected {other:?}"),
    }
    match events[1].kind {
        EventKind::PourStarted {
            pre_pour_weight_kg,
            average_slope_kg_per_s,
        } => {
            assert_eq!(pre_pour_weight_kg, 5.0);
            assert!(average_slope_kg_per_s < -0.05);
            assert_eq!(events[1].timestamp_ms, 4000);
        }
        other => panic!("unexpected {other:?}"),
    }
    let pour = events[2].pour().copied().expect("pour event");
    assert!((pour.pour_weight_kg - 0.5).abs() < 1e-5);
    assert!((pour.pour_volume_l - 0.5).abs() < 1e-5);
    assert_eq!(pour.duration_ms, 2000);

    let stats = manager.statistics(Channel::U1);
    assert_eq!(stats.total_pours, 1);
    assert!((manager.last_pour_volume(Channel::U1) - 0.5).abs() < 1e-5);
    assert!((manager.max_pour_volume(Channel::U1) - 0.5).abs() < 1e-5);
    assert_eq!(manager.stable_weight(Channel::U1), 4.5);
}

#[rstest]
fn oversized_pour_is_split_across_its_duration() {
    let mut m = manager_with_glass(0.2);
    feed(&mut m, &SETTLE_AND_POUR);
    let pours: Vec<ChangeEvent> = drain(&m).into_iter().filter(|e| e.pour().is_some()).collect();
    assert_eq!(pours.len(), 3);
    let stamps: Vec<u64> = pours.iter().map(|e| e.timestamp_ms).collect();
    assert_eq!(stamps, [4666, 5333, 6000]);
    for e in &pours {
        let p = e.pour().copied().expect("pour");
        assert!((p.pour_volume_l - 0.5 / 3.0).abs() < 1e-5);
    }
    assert_eq!(m.statistics(Channel::U1).total_pours, 3);
}

#[rstest]
fn slow_drain_while_restabilizing_is_reported_passively(mut manager: ChangeDetection) {
    feed(&mut manager, &SETTLE_AND_POUR);
    drain(&manager);
    feed(&mut manager, &[(7000, 4.2), (8000, 4.2), (9000, 4.2)]);
    assert_eq!(manager.state(Channel::U1), ChangeState::Stable);
    let events = drain(&manager);
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.name()).collect();
    assert_eq!(kinds, ["stable_detected", "pour_completed"]);
    let p = events[1].pour().copied().expect("pour");
    assert_eq!(p.duration_ms, 0);
    assert_eq!(p.average_slope_kg_per_s, 0.0);
    assert!((p.pour_weight_kg - 0.3).abs() < 1e-5);
    assert_eq!(manager.statistics(Channel::U1).total_pours, 2);
}

fn settled_at_five() -> ChangeDetection {
    let mut m = manager_with_glass(1.0);
    feed(&mut m, &[(0, 5.0), (1000, 5.0), (2000, 5.0)]);
    assert_eq!(m.state(Channel::U1), ChangeState::Stable);
    drain(&m);
    m
}

#[rstest]
#[case::small_drop_follows(5.0 - 0.1 + 0.05, 4.95, 0)]
#[case::large_drop_follows_and_reports(5.0 - 0.1 - 0.05, 4.85, 1)]
#[case::small_rise_follows(5.5, 5.5, 0)]
fn stable_anchor_follows_drift(#[case] reading: f32, #[case] anchor: f32, #[case] pours: usize) {
    let mut m = settled_at_five();
    feed(&mut m, &[(3000, reading)]);
    assert_eq!(m.state(Channel::U1), ChangeState::Stable);
    assert!((m.stable_weight(Channel::U1) - anchor).abs() < 1e-5);
    let events = drain(&m);
    assert_eq!(events.len(), pours);
    assert!(events.iter().all(|e| e.pour().is_some_and(|p| p.duration_ms == 0)));
}

fn settled_at_ten() -> (ChangeDetection, u64) {
    let mut m = manager_with_glass(1.0);
    feed(&mut m, &[(0, 10.0), (1000, 10.0), (2000, 10.0)]);
    assert_eq!(m.state(Channel::U1), ChangeState::Stable);
    (m, 2000)
}

/// Drain 1 kg at 0.04 kg/s, too gentle for the slope trigger.
fn slow_drain(m: &mut ChangeDetection, from_ms: u64) -> u64 {
    let mut ts = from_ms;
    for k in 1..=25u16 {
        ts += 1000;
        feed(m, &[(ts, 10.0 - 0.04 * f32::from(k))]);
        assert_eq!(m.state(Channel::U1), ChangeState::Stable, "t={ts}");
    }
    ts
}

fn pours(events: &[ChangeEvent]) -> Vec<PourDetails> {
    events.iter().filter_map(|e| e.pour().copied()).collect()
}

#[test]
fn slow_drain_alone_is_reported() {
    let (mut m, t) = settled_at_ten();
    let t = slow_drain(&mut m, t);
    feed(&mut m, &[(t + 1000, 9.0), (t + 2000, 9.0)]);
    assert_eq!(m.state(Channel::U1), ChangeState::Stable);

    let pours = pours(&drain(&m));
    assert!(!pours.is_empty());
    assert!(pours.iter().all(|p| p.duration_ms == 0));
    let total: f32 = pours.iter().map(|p| p.pour_weight_kg).sum();
    assert!((total - 1.0).abs() <= 0.1 + 1e-4, "reported {total}");
}

#[test]
fn slow_drain_then_active_pour_reports_both() {
    let (mut m, t) = settled_at_ten();
    let t = slow_drain(&mut m, t);
    feed(
        &mut m,
        &[
            (t + 1000, 8.75),
            (t + 2000, 8.5),
            (t + 3000, 8.5),
            (t + 4000, 8.5),
            (t + 5000, 8.5),
            (t + 6000, 8.5),
        ],
    );
    assert_eq!(m.state(Channel::U1), ChangeState::Stable);
    assert!((m.stable_weight(Channel::U1) - 8.5).abs() < 1e-5);

    let pours = pours(&drain(&m));
    assert!(pours.iter().any(|p| p.duration_ms == 0));
    assert!(pours.iter().any(|p| p.duration_ms > 0));
    let total: f32 = pours.iter().map(|p| p.pour_weight_kg).sum();
    assert!((total - 1.5).abs() < 1e-3, "reported {total}");
    assert_eq!(m.statistics(Channel::U1).total_pours as usize, pours.len());
}

#[test]
fn rise_beyond_window_is_a_keg_replacement() {
    let mut m = settled_at_five();
    feed(&mut m, &[(3000, 5.0 + 1.0 + 0.05)]);
    assert_eq!(m.state(Channel::U1), ChangeState::ReplacingKeg);
    let events = drain(&m);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0].kind,
        EventKind::KegReplaced {
            previous_weight_kg,
            ..
        } if previous_weight_kg == 5.0
    ));
    assert_eq!(m.statistics(Channel::U1).keg_replacements, 1);
}

#[test]
fn keg_removal_and_return() {
    let mut m = settled_at_five();
    feed(&mut m, &[(3000, 0.2), (4000, f32::NAN), (5000, 22.0)]);
    assert_eq!(m.state(Channel::U1), ChangeState::ReplacingKeg);
    let kinds: Vec<&str> = drain(&m).iter().map(|e| e.kind.name()).collect();
    assert_eq!(kinds, ["keg_removed", "keg_replaced"]);
    let stats = m.statistics(Channel::U1);
    assert_eq!(stats.keg_removals, 1);
    assert_eq!(stats.current_keg_start_ms, Some(5000));
}

#[test]
fn queue_keeps_the_newest_events() {
    let m = manager_with_glass(1.0);
    for ts in 0..=64 {
        m.fire_startup_event(ts);
    }
    assert_eq!(m.pending_event_count(), EVENT_QUEUE_CAPACITY);
    let stamps: Vec<u64> = drain(&m).iter().map(|e| e.timestamp_ms).collect();
    assert_eq!(stamps, (1..=64).collect::<Vec<_>>());
}

#[test]
fn pour_filter_drives_slope_while_stability_filter_drives_level() {
    let mut m = ChangeDetection::builder()
        .with_detection(DetectionCfg {
            stability_filter: FilterKind::Median,
            pour_filter: FilterKind::Kalman,
            stabilization_ms: 1000,
            ..DetectionCfg::default()
        })
        .try_build()
        .expect("valid config");
    let flat = FilteredReading::uniform(10.0);
    m.update(Channel::U2, &flat, 0);
    m.update(Channel::U2, &flat, 1000);
    assert_eq!(m.state(Channel::U2), ChangeState::Stable);
    m.update(Channel::U2, &flat, 2000);
    // Level unchanged, slope filter falling fast.
    let falling = flat.with(FilterKind::Kalman, Some(9.0));
    m.update(Channel::U2, &falling, 3000);
    assert_eq!(m.state(Channel::U2), ChangeState::Pouring);
    assert_eq!(m.stable_weight(Channel::U2), 10.0);
}
