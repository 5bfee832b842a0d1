use std::fs::File;
use std::io::Write;

use kegmon_config::{FilterChoice, load_file, load_toml};
use rstest::rstest;
use tempfile::tempdir;

const FULL: &str = r#"
[detection]
stability_filter = "hampel"
pour_filter = "kalman"
stabilization_ms = 3000
pour_ms = 4000
keg_absence_ms = 2000
keg_replacement_ms = 5000
weight_absent_kg = 0.5
level_increase_kg = 1.5
level_decrease_kg = 0.2
pour_slope_kg_per_s = -0.08

[filters]
window = 7
fir_order = 7

[[channels]]
keg_weight_kg = 4.5
max_valid_weight_kg = 25.0
glass_volume_l = 0.5
final_gravity = 1.012

[[channels]]
glass_volume_l = 0.3

[sampling]
rate_hz = 20
sensor_ms = 80

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn parses_full_document() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.detection.stability_filter, FilterChoice::Hampel);
    assert_eq!(cfg.detection.pour_ms, 4000);
    assert_eq!(cfg.filters.window, 7);
    assert_eq!(cfg.channels.len(), 2);
    assert!((cfg.channel(0).final_gravity - 1.012).abs() < 1e-6);
    // Unlisted fields and channels fall back to defaults.
    assert!((cfg.channel(1).keg_weight_kg - 4.0).abs() < 1e-6);
    assert!((cfg.channel(3).max_valid_weight_kg - 30.0).abs() < 1e-6);
    assert_eq!(cfg.sampling.timeout_ms, 80);
}

#[test]
fn rejects_unknown_filter_name() {
    let err = load_toml("[detection]\nstability_filter = \"lowpass\"\n").unwrap_err();
    assert!(err.to_string().contains("unknown variant"));
}

#[rstest]
#[case("[detection]\npour_slope_kg_per_s = 0.05\n", "pour_slope_kg_per_s must be < 0")]
#[case("[detection]\nlevel_decrease_kg = -0.1\n", "level_decrease_kg must be >= 0")]
#[case("[filters]\nwindow = 0\n", "filters.window must be in [1, 64]")]
#[case("[filters]\nema_alpha = 1.5\n", "filters.ema_alpha must be in (0.0, 1.0]")]
#[case("[filters]\nsample_rate_hz = 0.0\n", "filters.sample_rate_hz must be > 0")]
#[case("[sampling]\nrate_hz = 0\n", "sampling.rate_hz must be > 0")]
#[case("[[channels]]\nfinal_gravity = 0.0\n", "channels[U1].final_gravity must be > 0")]
#[case(
    "[[channels]]\nkeg_weight_kg = 40.0\n",
    "channels[U1].keg_weight_kg must not exceed max_valid_weight_kg"
)]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn rejects_invalid_fields(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error '{err}' does not mention '{needle}'"
    );
}

#[test]
fn rejects_more_than_four_channels() {
    let toml = "[[channels]]\n".repeat(5);
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("five channels");
    assert!(format!("{err}").contains("at most 4"));
}

#[test]
fn load_file_reads_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kegmon.toml");
    let mut f = File::create(&path).unwrap();
    f.write_all(FULL.as_bytes()).unwrap();
    drop(f);

    let cfg = load_file(&path).expect("load file");
    assert_eq!(cfg.sampling.rate_hz, 20);
}

#[test]
fn load_file_reports_path_on_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let err = load_file(&path).unwrap_err();
    assert!(format!("{err}").contains("missing.toml"));
}
