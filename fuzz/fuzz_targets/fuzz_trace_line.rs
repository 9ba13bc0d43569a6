//! Fuzz target for tracer line classification and escape decoding.
//!
//! Lines can be cut off anywhere (the tracer truncates long strings), so
//! dangling backslashes and unterminated quotes must not panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pscope_core::monitor::{decode_payload, parse_line};

fuzz_target!(|data: &str| {
    let _ = parse_line(data);
    let _ = decode_payload(data);
});
