//! Fuzz target for network description parsing.
//!
//! Feeds arbitrary UTF-8 text to the config parser and directive parser,
//! checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use maccnet::config::fuzz_parse_config;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_config(text);
});
