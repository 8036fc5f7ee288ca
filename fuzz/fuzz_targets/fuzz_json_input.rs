//! Fuzz target for JSON training requests and model files.

#![no_main]

use hmm_core::{parse_json, parse_model_json};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_json(text);
        let _ = parse_model_json(text);
    }
});
