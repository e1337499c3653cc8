//! Fuzz target for `{{Token}}` expansion.
//!
//! Run with: cargo +nightly fuzz run fuzz_token_expansion
//!
//! The first line of input is split into `name=value` token definitions
//! (which may reference each other); the rest is expanded against them.
//! Expansion must terminate and be stable on an already-expanded string
//! only when no tokens remain.

#![no_main]

use libfuzzer_sys::fuzz_target;
use patchdex_core::tokens::{TokenTable, expand_str, has_unresolved_tokens};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (defs, input) = text.split_once('\n').unwrap_or(("", text));

    let mut tokens = TokenTable::new();
    for def in defs.split(';') {
        if let Some((name, value)) = def.split_once('=') {
            tokens.insert(name, value);
        }
    }

    let expanded = expand_str(input, &tokens);
    if !has_unresolved_tokens(&expanded) {
        assert_eq!(expand_str(&expanded, &tokens), expanded);
    }
});
