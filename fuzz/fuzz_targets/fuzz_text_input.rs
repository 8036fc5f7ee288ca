//! Fuzz target for the whitespace-separated corpus reader.
//!
//! Arbitrary bytes must produce either a validated input or an error,
//! never a panic or an allocation sized by an untrusted header.

#![no_main]

use hmm_core::parse_text;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(input) = parse_text(text) {
            assert_eq!(input.corpus.n_symbols(), input.n_symbols);
            assert!(input.corpus.iter().all(|seq| !seq.is_empty()));
        }
    }
});
