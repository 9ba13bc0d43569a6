//! Fuzz target for /proc/[pid]/statm parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pscope_core::collect::proc_parsers::parse_statm_content;

fuzz_target!(|data: &str| {
    if let Some(stats) = parse_statm_content(data) {
        let _ = stats.to_kilobytes(4096);
    }
});
