#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = toml::from_str::<fantune_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A valid config always yields a usable power schedule
            assert!(cfg.sweep.min_power > 0.0 && cfg.sweep.min_power <= 100.0);
            assert!(cfg.max_fan_rpm.values().all(|&rpm| rpm > 0));
        }
    }
});
