//! Fuzz target for trainer config parsing and validation.

#![no_main]

use hmm_config::{validate_config, TrainerConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<TrainerConfig>(text) {
            let _ = validate_config(&config);
        }
    }
});
