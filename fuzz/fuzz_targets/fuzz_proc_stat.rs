//! Fuzz target for /proc/[pid]/stat parsing.
//!
//! Command names may hold any bytes, including `)`, so the parser must
//! survive arbitrary input and only return None when fields are missing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pscope_core::collect::proc_parsers::parse_stat_content;

fuzz_target!(|data: &str| {
    if let Some(stat) = parse_stat_content(data) {
        let _ = stat.to_seconds(100).age(0.0);
    }
});
