//! Fuzz target for `key: value` sources (status, io).

#![no_main]

use libfuzzer_sys::fuzz_target;
use pscope_core::collect::proc_parsers::{decode_cmdline, parse_key_values};

fuzz_target!(|data: &[u8]| {
    let _ = decode_cmdline(data);
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_key_values(text);
    }
});
