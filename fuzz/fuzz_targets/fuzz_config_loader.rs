#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = kegmon_core::ChangeDetection::from_toml(data);

    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = kegmon_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A validated config must always build.
        if let Err(e) = kegmon_core::ChangeDetection::from_config(&cfg) {
            panic!("validated config rejected by builder: {e}");
        }
    }
});
