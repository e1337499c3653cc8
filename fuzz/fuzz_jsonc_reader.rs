//! Fuzz target for the lenient JSON-with-comments reader.
//!
//! Run with: cargo +nightly fuzz run fuzz_jsonc_reader
//!
//! Feeds arbitrary text through comment and trailing-comma stripping and
//! the JSON parser. Any input that already parses as strict JSON must parse
//! to the same value after stripping.

#![no_main]

use libfuzzer_sys::fuzz_target;
use patchdex_core::jsonc;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let lenient = jsonc::parse_str(text);
    if let Ok(strict) = serde_json::from_str::<serde_json::Value>(text) {
        assert_eq!(lenient.ok(), Some(strict));
    }
});
