use kegmon_core::{Filter, FilterKind, FilterParams};
use rstest::rstest;

fn run(kind: FilterKind, xs: &[f32]) -> (f32, Filter) {
    let mut f = Filter::new(kind, &FilterParams::default());
    let mut last = f32::NAN;
    for &x in xs {
        last = f.update(x);
    }
    (last, f)
}

#[rstest]
#[case::median_ignores_spike(FilterKind::Median, &[1.0, 2.0, 3.0, 4.0, 100.0], 3.0)]
#[case::hampel_replaces_center(FilterKind::Hampel, &[1.0, 2.0, 3.0, 4.0, 100.0, 5.0, 6.0], 5.0)]
#[case::zscore_passes_raw(FilterKind::ZScore, &[10.0, 10.1, 9.9, 10.0, 50.0], 50.0)]
#[case::moving_average(FilterKind::MovingAverage, &[1.0, 2.0, 3.0, 4.0, 5.0], 3.0)]
#[case::weighted_favours_recent(FilterKind::WeightedMa, &[1.0, 2.0], 2.5 / 1.5)]
#[case::ema_step(FilterKind::Ema, &[0.0, 10.0], 3.0)]
#[case::fir_constant(FilterKind::Fir, &[7.0; 8], 7.0)]
#[case::raw(FilterKind::Raw, &[1.0, -4.0], -4.0)]
fn filter_output(#[case] kind: FilterKind, #[case] xs: &[f32], #[case] expected: f32) {
    let (y, _) = run(kind, xs);
    assert!((y - expected).abs() < 1e-4, "{kind}: got {y}, want {expected}");
}

#[rstest]
#[case(FilterKind::Hampel, true)]
#[case(FilterKind::ZScore, true)]
#[case(FilterKind::Median, false)]
fn outlier_flag(#[case] kind: FilterKind, #[case] flagged: bool) {
    let (_, f) = run(kind, &[10.0, 10.1, 9.9, 10.0, 50.0, 10.0, 10.1]);
    // Hampel flags when the spike reaches the window center.
    let (_, at_spike) = run(kind, &[10.0, 10.1, 9.9, 10.0, 50.0]);
    assert_eq!(f.is_outlier() || at_spike.is_outlier(), flagged, "{kind}");
}

#[rstest]
#[case(FilterKind::Kalman)]
#[case(FilterKind::Butterworth)]
#[case(FilterKind::Chebyshev)]
#[case(FilterKind::AlphaBeta)]
#[case(FilterKind::Complementary)]
fn recursive_filters_track_a_step(#[case] kind: FilterKind) {
    let mut xs = vec![20.0f32; 5];
    xs.extend(std::iter::repeat_n(15.0, 200));
    let (y, f) = run(kind, &xs);
    assert!((y - 15.0).abs() < 0.05, "{kind}: {y}");
    assert!(f.variance() >= 0.0);
}

#[test]
fn filter_kind_names_are_distinct() {
    let mut names: Vec<&str> = FilterKind::ALL.iter().map(|k| k.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), FilterKind::COUNT);
}
