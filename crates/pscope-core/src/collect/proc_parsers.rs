//! Parsers for /proc filesystem files.
//!
//! Each parser takes file content and has no I/O of its own, so the
//! collector can read sources independently and tests can feed fabricated
//! content directly.
//!
//! # Files Parsed
//! - `/proc/[pid]/status` - Colon-delimited status block
//! - `/proc/[pid]/cmdline` - NUL-separated argument buffer
//! - `/proc/[pid]/statm` - Memory statistics (pages)
//! - `/proc/[pid]/stat` - CPU timing record (clock ticks)
//! - `/proc/[pid]/io` - I/O counters
//! - `/proc/uptime` - System uptime (seconds)

use serde::{Deserialize, Serialize};

/// Parse a colon-delimited `key: value` block.
///
/// Lines without a colon are skipped; keys and values are trimmed and the
/// original line order is kept. Used for both `status` and `io`.
pub fn parse_key_values(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Decode a NUL-separated command line buffer into a single string.
///
/// Separators become spaces and surrounding whitespace is trimmed, so
/// `b"prog\0--flag\0val\0"` decodes to `"prog --flag val"`.
pub fn decode_cmdline(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace('\0', " ")
        .trim()
        .to_string()
}

/// Memory statistics from /proc/[pid]/statm.
///
/// All values are in pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemStats {
    /// Total program size (pages).
    pub size: u64,
    /// Resident set size (pages).
    pub resident: u64,
    /// Shared pages.
    pub shared: u64,
    /// Text (code) pages.
    pub text: u64,
    /// Library pages (unused since Linux 2.6).
    pub lib: u64,
    /// Data + stack pages.
    pub data: u64,
    /// Dirty pages (unused since Linux 2.6).
    pub dt: u64,
}

impl MemStats {
    /// Convert the page-granular fields to kilobytes.
    pub fn to_kilobytes(&self, page_size: u64) -> MemoryUsage {
        let kb = |pages: u64| (pages as f64) * (page_size as f64) / 1024.0;
        MemoryUsage {
            total_program_size: kb(self.size),
            resident_set_size: kb(self.resident),
            shared_pages: kb(self.shared),
            text: kb(self.text),
            data_stack: kb(self.data),
        }
    }
}

/// Memory usage in kilobytes, derived from [`MemStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_program_size: f64,
    pub resident_set_size: f64,
    pub shared_pages: f64,
    pub text: f64,
    pub data_stack: f64,
}

impl MemoryUsage {
    /// Named fields in display order.
    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("total_program_size", self.total_program_size),
            ("resident_set_size", self.resident_set_size),
            ("shared_pages", self.shared_pages),
            ("text", self.text),
            ("data_stack", self.data_stack),
        ]
    }
}

/// Parse statm file content.
///
/// Format: "size resident shared text lib data dt"
pub fn parse_statm_content(content: &str) -> Option<MemStats> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 7 {
        return None;
    }

    Some(MemStats {
        size: parts[0].parse().ok()?,
        resident: parts[1].parse().ok()?,
        shared: parts[2].parse().ok()?,
        text: parts[3].parse().ok()?,
        lib: parts[4].parse().ok()?,
        data: parts[5].parse().ok()?,
        dt: parts[6].parse().ok()?,
    })
}

/// CPU timing fields from /proc/[pid]/stat, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStat {
    /// Field 14: time scheduled in user mode.
    pub utime: u64,
    /// Field 15: time scheduled in kernel mode.
    pub stime: u64,
    /// Field 22: start time after system boot.
    pub starttime: u64,
}

impl CpuStat {
    /// Convert tick counts to seconds using the platform tick divisor.
    pub fn to_seconds(&self, clock_ticks: u64) -> CpuTimes {
        let ticks = clock_ticks.max(1) as f64;
        CpuTimes {
            user_time: self.utime as f64 / ticks,
            system_time: self.stime as f64 / ticks,
            start_time: self.starttime as f64 / ticks,
        }
    }
}

/// CPU timing in seconds, derived from [`CpuStat`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuTimes {
    pub user_time: f64,
    pub system_time: f64,
    /// Seconds after boot at which the process started.
    pub start_time: f64,
}

impl CpuTimes {
    /// Named fields in display order.
    pub fn fields(&self) -> [(&'static str, f64); 3] {
        [
            ("user_time", self.user_time),
            ("system_time", self.system_time),
            ("start_time", self.start_time),
        ]
    }

    /// Process age given the host uptime.
    pub fn age(&self, host_uptime: f64) -> f64 {
        host_uptime - self.start_time
    }
}

/// Parse stat file content.
///
/// The command name (field 2) is parenthesised and may contain spaces or
/// parentheses, so fields are counted from the last `)`.
pub fn parse_stat_content(content: &str) -> Option<CpuStat> {
    let close = content.rfind(')')?;
    // Field 3 (state) is the first entry after the command name.
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    let field = |n: usize| rest.get(n - 3).and_then(|v| v.parse::<u64>().ok());

    Some(CpuStat {
        utime: field(14)?,
        stime: field(15)?,
        starttime: field(22)?,
    })
}

/// Parse /proc/uptime content; returns the first field in seconds.
pub fn parse_uptime_content(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_values_status() {
        let content = "Name:\tbash\nState:\tS (sleeping)\nTgid:\t1234\nGroups:\t\nnot a pair\nUid:\t1000\t1000\t1000\t1000\n";
        let pairs = parse_key_values(content);
        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], ("Name".to_string(), "bash".to_string()));
        assert_eq!(pairs[1], ("State".to_string(), "S (sleeping)".to_string()));
        assert_eq!(pairs[3], ("Groups".to_string(), String::new()));
        assert_eq!(pairs[4].1, "1000\t1000\t1000\t1000");
    }

    #[test]
    fn test_parse_key_values_io() {
        let content = "rchar: 12345678\nwchar: 87654321\nsyscr: 1000\n";
        let pairs = parse_key_values(content);
        assert_eq!(
            pairs,
            vec![
                ("rchar".to_string(), "12345678".to_string()),
                ("wchar".to_string(), "87654321".to_string()),
                ("syscr".to_string(), "1000".to_string()),
            ]
        );
    }

    #[test]
    fn test_value_with_colon_kept_whole() {
        let pairs = parse_key_values("Cpus_allowed_list:\t0-3:1\n");
        assert_eq!(pairs[0].1, "0-3:1");
    }

    #[test]
    fn test_decode_cmdline() {
        assert_eq!(decode_cmdline(b"prog\0--flag\0val\0"), "prog --flag val");
        assert_eq!(decode_cmdline(b""), "");
        assert_eq!(decode_cmdline(b"\0\0"), "");
        assert_eq!(decode_cmdline(b"single"), "single");
    }

    #[test]
    fn test_parse_statm_content() {
        let stats = parse_statm_content("1000 500 100 50 0 200 0\n").unwrap();
        assert_eq!(stats.size, 1000);
        assert_eq!(stats.resident, 500);
        assert_eq!(stats.shared, 100);
        assert_eq!(stats.text, 50);
        assert_eq!(stats.data, 200);
    }

    #[test]
    fn test_parse_statm_short_record() {
        assert!(parse_statm_content("1000 500 100").is_none());
        assert!(parse_statm_content("a b c d e f g").is_none());
    }

    #[test]
    fn test_statm_to_kilobytes() {
        let stats = parse_statm_content("1000 500 100 50 0 200 0").unwrap();
        let mem = stats.to_kilobytes(4096);
        assert_eq!(mem.total_program_size, 4000.0);
        assert_eq!(mem.resident_set_size, 2000.0);
        assert_eq!(mem.shared_pages, 400.0);
        assert_eq!(mem.text, 200.0);
        assert_eq!(mem.data_stack, 800.0);
    }

    #[test]
    fn test_parse_stat_content() {
        let content = "1234 (bash) S 1 1234 1234 34816 1234 4194304 1000 0 0 0 250 75 0 0 20 0 1 0 12345 10000000 500 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0";
        let stat = parse_stat_content(content).unwrap();
        assert_eq!(stat.utime, 250);
        assert_eq!(stat.stime, 75);
        assert_eq!(stat.starttime, 12345);
    }

    #[test]
    fn test_parse_stat_comm_with_spaces_and_parens() {
        let content = "99 (my (odd) prog) R 1 99 99 0 -1 0 0 0 0 0 10 20 0 0 20 0 1 0 300 0 0";
        let stat = parse_stat_content(content).unwrap();
        assert_eq!(stat.utime, 10);
        assert_eq!(stat.stime, 20);
        assert_eq!(stat.starttime, 300);
    }

    #[test]
    fn test_parse_stat_truncated() {
        assert!(parse_stat_content("1 (x) S 1 2 3").is_none());
        assert!(parse_stat_content("no parens here").is_none());
    }

    #[test]
    fn test_cpu_to_seconds_and_age() {
        let stat = CpuStat {
            utime: 250,
            stime: 75,
            starttime: 12345,
        };
        let times = stat.to_seconds(100);
        assert_eq!(times.user_time, 2.5);
        assert_eq!(times.system_time, 0.75);
        assert_eq!(times.start_time, 123.45);
        assert_eq!(times.age(1000.5), 1000.5 - 123.45);
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime_content("5000.25 19000.00\n"), Some(5000.25));
        assert_eq!(parse_uptime_content(""), None);
        assert_eq!(parse_uptime_content("abc"), None);
    }
}
