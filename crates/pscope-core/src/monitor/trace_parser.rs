//! Tracer output decoding.
//!
//! The tracer's output is text meant for people, so recovering payload
//! bytes from it is heuristic. All of that is confined to [`parse_line`],
//! which maps one raw line to a [`TraceEvent`] and has no other inputs.
//!
//! Recognised lines:
//! - `write(1, "hello\n", 6) = 6` (optionally prefixed by `[pid N]`)
//! - `strace: Process 42 attached` / `detached`
//! - `+++ exited with 0 +++`, `+++ killed by SIGKILL +++`
//! - `--- SIGINT {si_signo=SIGINT, ...} ---`

use std::fmt;

/// Kind of a tracer status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Attach,
    Detach,
    Exit,
    Signal,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusKind::Attach => "attach",
            StatusKind::Detach => "detach",
            StatusKind::Exit => "exit",
            StatusKind::Signal => "signal",
        };
        f.write_str(s)
    }
}

/// One decoded tracer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Bytes the target wrote to its standard output.
    Payload(Vec<u8>),
    /// A tracer status notice; carries the trimmed line.
    Status(StatusKind, String),
    /// Anything else (other syscalls, resumed calls, noise).
    Unrecognized,
}

const STDOUT_WRITE: &str = "write(1, \"";

/// Classify one line of tracer output.
pub fn parse_line(line: &str) -> TraceEvent {
    let trimmed = line.trim();
    let body = strip_pid_prefix(trimmed);

    if let Some(rest) = body.strip_prefix(STDOUT_WRITE) {
        return TraceEvent::Payload(decode_payload(quoted_prefix(rest)));
    }

    match status_kind(body) {
        Some(kind) => TraceEvent::Status(kind, trimmed.to_string()),
        None => TraceEvent::Unrecognized,
    }
}

/// Remove a leading `[pid N]` marker or bare `N ` pid column.
fn strip_pid_prefix(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("[pid") {
        if let Some(close) = rest.find(']') {
            return rest[close + 1..].trim_start();
        }
    }
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && line[digits..].starts_with(char::is_whitespace) {
        return line[digits..].trim_start();
    }
    line
}

fn status_kind(body: &str) -> Option<StatusKind> {
    let is_notice = body.starts_with("strace:") || body.starts_with("+++") || body.starts_with("---");
    if !is_notice {
        return None;
    }
    let lower = body.to_ascii_lowercase();
    if lower.contains("detach") {
        Some(StatusKind::Detach)
    } else if lower.contains("attach") {
        Some(StatusKind::Attach)
    } else if lower.contains("exit") {
        Some(StatusKind::Exit)
    } else if lower.contains("signal") || lower.contains("killed by") || lower.starts_with("--- sig") {
        Some(StatusKind::Signal)
    } else {
        None
    }
}

/// The escaped body of a C string literal, up to its closing quote.
///
/// A line cut off mid-string yields everything that is present.
fn quoted_prefix(rest: &str) -> &str {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return &rest[..i],
            _ => i += 1,
        }
    }
    rest
}

/// Undo the tracer's string escaping.
///
/// `\n`, `\t`, `\r`, `\v`, `\f`, `\"` and `\\` become their bytes; hex
/// (`\xNN`) and octal (`\NNN`) escapes are dropped; any other escape is
/// kept literally.
pub fn decode_payload(escaped: &str) -> Vec<u8> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let next = bytes[i + 1];
        match next {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'v' => out.push(0x0b),
            b'f' => out.push(0x0c),
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            b'x' => {
                let hex = bytes[i + 2..]
                    .iter()
                    .take(2)
                    .take_while(|b| b.is_ascii_hexdigit())
                    .count();
                if hex == 2 {
                    i += 4;
                    continue;
                }
                out.extend_from_slice(&bytes[i..i + 2]);
            }
            b'0'..=b'7' => {
                let octal = bytes[i + 1..]
                    .iter()
                    .take(3)
                    .take_while(|b| (b'0'..=b'7').contains(b))
                    .count();
                i += 1 + octal;
                continue;
            }
            _ => out.extend_from_slice(&bytes[i..i + 2]),
        }
        i += 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(line: &str) -> Vec<u8> {
        match parse_line(line) {
            TraceEvent::Payload(bytes) => bytes,
            other => panic!("expected payload, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_write() {
        assert_eq!(payload("write(1, \"hello\\n\", 6) = 6"), b"hello\n");
    }

    #[test]
    fn test_pid_prefixed_write() {
        assert_eq!(payload("[pid  4242] write(1, \"a\\tb\", 3) = 3"), b"a\tb");
        assert_eq!(payload("4242  write(1, \"x\", 1) = 1"), b"x");
    }

    #[test]
    fn test_escaped_quote_does_not_end_payload() {
        assert_eq!(
            payload(r#"write(1, "say \"hi\"\r\n", 10) = 10"#),
            b"say \"hi\"\r\n"
        );
    }

    #[test]
    fn test_hex_and_octal_stripped() {
        assert_eq!(payload(r#"write(1, "\x1b[0mok\33[1m", 12) = 12"#), b"[0mok[1m");
        assert_eq!(decode_payload(r"a\0b\177c"), b"abc");
    }

    #[test]
    fn test_truncated_string() {
        assert_eq!(payload("write(1, \"partial"), b"partial");
        assert_eq!(payload("write(1, \"abc\"..., 4096) = 4096"), b"abc");
    }

    #[test]
    fn test_unfinished_write_keeps_payload() {
        assert_eq!(
            payload("[pid 7] write(1, \"tick\\n\", 5 <unfinished ...>"),
            b"tick\n"
        );
    }

    #[test]
    fn test_other_descriptors_unrecognized() {
        assert_eq!(parse_line("write(2, \"exit now\", 8) = 8"), TraceEvent::Unrecognized);
        assert_eq!(parse_line("write(11, \"x\", 1) = 1"), TraceEvent::Unrecognized);
        assert_eq!(parse_line("<... write resumed>) = 6"), TraceEvent::Unrecognized);
        assert_eq!(parse_line(""), TraceEvent::Unrecognized);
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(
            parse_line("strace: Process 4242 attached\n"),
            TraceEvent::Status(StatusKind::Attach, "strace: Process 4242 attached".into())
        );
        assert!(matches!(
            parse_line("strace: Process 4242 detached"),
            TraceEvent::Status(StatusKind::Detach, _)
        ));
        assert!(matches!(
            parse_line("+++ exited with 0 +++"),
            TraceEvent::Status(StatusKind::Exit, _)
        ));
        assert!(matches!(
            parse_line("[pid 9] +++ killed by SIGKILL +++"),
            TraceEvent::Status(StatusKind::Signal, _)
        ));
        assert!(matches!(
            parse_line("--- SIGINT {si_signo=SIGINT, si_code=SI_KERNEL} ---"),
            TraceEvent::Status(StatusKind::Signal, _)
        ));
    }

    #[test]
    fn test_decode_unknown_escape_kept() {
        assert_eq!(decode_payload(r"a\qb"), b"a\\qb");
        assert_eq!(decode_payload("trailing\\"), b"trailing\\");
        assert_eq!(decode_payload(r"\xZZ"), b"\\xZZ");
    }
}
