//! Fuzz target for filename glob matching.
//!
//! Run with: cargo +nightly fuzz run fuzz_glob_match
//!
//! The first byte picks where the input splits into a glob and a filename.
//! Every glob must compile, match itself when it has no wildcards, and
//! `*` must match every filename.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pyver_core::matcher::{compile_glob, glob_matches};

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = split as usize % (rest.len() + 1);
    let (Ok(glob), Ok(filename)) = (
        std::str::from_utf8(&rest[..split]),
        std::str::from_utf8(&rest[split..]),
    ) else {
        return;
    };

    assert!(compile_glob(glob).is_ok());
    let _ = glob_matches(glob, filename);
    if !glob.contains(['*', '?']) {
        assert!(glob_matches(glob, glob));
    }
    assert!(glob_matches("*", filename));
});
