//! Fuzz target for config parsing and rule loading.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Any config that parses and validates must either load into a registry or
//! fail with a `LoadError`; neither step may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = pyver_config::AppConfig::parse(s) {
        let _ = pyver_core::registry_from_config(&config);
    }
});
