//! Fuzz target for the full compile path.
//!
//! Anything that parses is compiled into both documents, exercising the
//! FOV arithmetic on arbitrary kernel sizes and dilations.

#![no_main]

use libfuzzer_sys::fuzz_target;
use maccnet::config::fuzz_compile_network;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_compile_network(text);
});
