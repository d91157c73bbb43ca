//! Fuzz target for the built-in extractors.
//!
//! Run with: cargo +nightly fuzz run fuzz_builtin_rules
//!
//! Feeds arbitrary content to every built-in rule. Rules may fail, but
//! accepted results must carry a confidence in `0.0..=1.0`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pyver_core::builtin_rules;

fuzz_target!(|data: &[u8]| {
    for rule in builtin_rules() {
        let filename = rule.condition().file_pattern().replace('*', "x");
        match rule.apply(data, &filename) {
            Ok(result) if result.found => assert!((0.0..=1.0).contains(&result.confidence)),
            _ => {}
        }
    }
});
