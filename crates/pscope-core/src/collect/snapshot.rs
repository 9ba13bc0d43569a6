//! Process fact collector.
//!
//! Builds a [`ProcessSnapshot`] for one pid from the per-process text
//! sources under a [`ProcFs`] root. Every source is read independently: a
//! missing source leaves its fields absent, a permission failure marks the
//! field as denied, and anything unexpected is recorded in the `error`
//! field. Only a vanished process is reported as an error to the caller.
//!
//! # Field Set
//! - status keys verbatim (`Name`, `State`, `VmRSS`, `Threads`, ...)
//! - `cmdline`
//! - `memory` (KB): total_program_size, resident_set_size, shared_pages, text, data_stack
//! - `cpu` (seconds): user_time, system_time, start_time
//! - `uptime` (seconds since the process started)
//! - `fd_count`, `fd_details`
//! - `io`
//! - `error`, when some source failed unexpectedly

use super::proc_parsers::{
    decode_cmdline, parse_key_values, parse_stat_content, parse_statm_content,
    parse_uptime_content,
};
use super::procfs::ProcFs;
use crate::logging::event_names;
use chrono::{DateTime, Utc};
use pscope_common::{Error, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use tracing::{debug, span, warn, Level};

/// Default cap on resolved descriptor targets.
pub const DEFAULT_FD_DETAIL_LIMIT: usize = 10;

/// Placeholder for an I/O counter block that could not be read.
pub const IO_UNREADABLE: &str = "(Unable to read I/O statistics)";

/// Shown when collection is attempted on a host without `/proc`.
pub const LINUX_ONLY: &str = "This function is only available on Linux";

/// A single snapshot value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Kilobytes(f64),
    Seconds(f64),
    Count(u64),
    /// The OS refused access to the source.
    Denied,
    /// Nested named values, in source order.
    Group(Vec<(String, FieldValue)>),
    /// `(descriptor id, target path)` pairs.
    Descriptors(Vec<(String, String)>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Kilobytes(v) | FieldValue::Seconds(v) => Some(*v),
            FieldValue::Count(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&[(String, FieldValue)]> {
        match self {
            FieldValue::Group(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_descriptors(&self) -> Option<&[(String, String)]> {
        match self {
            FieldValue::Descriptors(entries) => Some(entries),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Kilobytes(kb) => write!(f, "{kb} KB"),
            FieldValue::Seconds(secs) => write!(f, "{secs:.2} s"),
            FieldValue::Count(n) => write!(f, "{n}"),
            FieldValue::Denied => f.write_str("(Permission denied)"),
            FieldValue::Group(entries) => {
                let parts: Vec<String> = entries.iter().map(|(k, v)| format!("{k}={v}")).collect();
                f.write_str(&parts.join(", "))
            }
            FieldValue::Descriptors(entries) => {
                let parts: Vec<String> = entries.iter().map(|(id, t)| format!("{id}->{t}")).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Kilobytes(v) | FieldValue::Seconds(v) => serializer.serialize_f64(*v),
            FieldValue::Count(n) => serializer.serialize_u64(*n),
            FieldValue::Denied => serializer.serialize_str("(Permission denied)"),
            FieldValue::Group(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            FieldValue::Descriptors(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for pair in entries {
                    seq.serialize_element(pair)?;
                }
                seq.end()
            }
        }
    }
}

/// Point-in-time fact set for one process.
///
/// Fields are present only when their source was readable; absence means
/// "unavailable", never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pid: String,
    collected_at: DateTime<Utc>,
    fields: BTreeMap<String, FieldValue>,
}

impl ProcessSnapshot {
    pub fn new(pid: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            collected_at: Utc::now(),
            fields: BTreeMap::new(),
        }
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `error` field, if any source failed unexpectedly.
    pub fn error(&self) -> Option<&str> {
        self.get("error").and_then(FieldValue::as_text)
    }

    /// True when the snapshot carries nothing but an error.
    pub fn is_error_only(&self) -> bool {
        self.len() == 1 && self.error().is_some()
    }

    fn record_error(&mut self, message: String) {
        let combined = match self.error() {
            Some(existing) => format!("{existing}; {message}"),
            None => format!("Error reading process information: {message}"),
        };
        self.insert("error", FieldValue::Text(combined));
    }
}

/// Outcome of reading one source.
enum Read<T> {
    Ok(T),
    Missing,
    Denied,
}

/// Collects snapshots from a proc tree.
#[derive(Debug, Clone)]
pub struct FactCollector {
    procfs: ProcFs,
    fd_limit: usize,
}

impl FactCollector {
    pub fn new(procfs: ProcFs) -> Self {
        Self {
            procfs,
            fd_limit: DEFAULT_FD_DETAIL_LIMIT,
        }
    }

    /// Cap the number of descriptor targets resolved into `fd_details`.
    pub fn with_fd_limit(mut self, fd_limit: usize) -> Self {
        self.fd_limit = fd_limit;
        self
    }

    pub fn procfs(&self) -> &ProcFs {
        &self.procfs
    }

    /// Collect a snapshot for `pid`.
    ///
    /// Returns [`Error::ProcessNotFound`] when the process directory is gone
    /// or the pid is not numeric; every other failure is folded into the
    /// snapshot.
    pub fn collect(&self, pid: &str) -> Result<ProcessSnapshot> {
        let _span = span!(Level::DEBUG, "collect", pid).entered();

        if !self.procfs.is_supported() {
            let mut snapshot = ProcessSnapshot::new(pid);
            snapshot.insert("error", FieldValue::Text(LINUX_ONLY.to_string()));
            return Ok(snapshot);
        }

        if !self.procfs.exists(pid) {
            debug!(event = event_names::COLLECT_NOT_FOUND, pid, "process not found");
            return Err(Error::not_found(pid));
        }

        let mut snapshot = ProcessSnapshot::new(pid);
        self.collect_status(pid, &mut snapshot);
        self.collect_cmdline(pid, &mut snapshot);
        self.collect_memory(pid, &mut snapshot);
        self.collect_cpu(pid, &mut snapshot);
        self.collect_descriptors(pid, &mut snapshot);
        self.collect_io(pid, &mut snapshot);

        if let Some(error) = snapshot.error() {
            warn!(event = event_names::COLLECT_PARTIAL, pid, error, "snapshot incomplete");
        }
        debug!(
            event = event_names::COLLECT_FINISHED,
            pid,
            field_count = snapshot.len(),
            "snapshot collected"
        );
        Ok(snapshot)
    }

    /// Read a per-process source, classifying the failure.
    fn read_source<T>(
        &self,
        pid: &str,
        name: &str,
        snapshot: &mut ProcessSnapshot,
        read: impl FnOnce(&std::path::Path) -> io::Result<T>,
    ) -> Read<T> {
        let Some(path) = self.procfs.source(pid, name) else {
            return Read::Missing;
        };
        match read(&path) {
            Ok(value) => Read::Ok(value),
            Err(e) => match e.kind() {
                io::ErrorKind::NotFound => Read::Missing,
                io::ErrorKind::PermissionDenied => Read::Denied,
                _ => {
                    snapshot.record_error(format!("{name}: {e}"));
                    Read::Missing
                }
            },
        }
    }

    fn collect_status(&self, pid: &str, snapshot: &mut ProcessSnapshot) {
        match self.read_source(pid, "status", snapshot, |p| std::fs::read_to_string(p)) {
            Read::Ok(content) => {
                for (key, value) in parse_key_values(&content) {
                    snapshot.insert(key, FieldValue::Text(value));
                }
            }
            Read::Denied => snapshot.insert("status", FieldValue::Denied),
            Read::Missing => {}
        }
    }

    fn collect_cmdline(&self, pid: &str, snapshot: &mut ProcessSnapshot) {
        match self.read_source(pid, "cmdline", snapshot, |p| std::fs::read(p)) {
            Read::Ok(raw) => snapshot.insert("cmdline", FieldValue::Text(decode_cmdline(&raw))),
            Read::Denied => snapshot.insert("cmdline", FieldValue::Denied),
            Read::Missing => {}
        }
    }

    fn collect_memory(&self, pid: &str, snapshot: &mut ProcessSnapshot) {
        match self.read_source(pid, "statm", snapshot, |p| std::fs::read_to_string(p)) {
            Read::Ok(content) => {
                if let Some(stats) = parse_statm_content(&content) {
                    let usage = stats.to_kilobytes(self.procfs.page_size());
                    let group = usage
                        .fields()
                        .iter()
                        .map(|(k, v)| (k.to_string(), FieldValue::Kilobytes(*v)))
                        .collect();
                    snapshot.insert("memory", FieldValue::Group(group));
                }
            }
            Read::Denied => snapshot.insert("memory", FieldValue::Denied),
            Read::Missing => {}
        }
    }

    fn collect_cpu(&self, pid: &str, snapshot: &mut ProcessSnapshot) {
        let content = match self.read_source(pid, "stat", snapshot, |p| std::fs::read_to_string(p))
        {
            Read::Ok(content) => content,
            Read::Denied => {
                snapshot.insert("cpu", FieldValue::Denied);
                return;
            }
            Read::Missing => return,
        };
        let Some(stat) = parse_stat_content(&content) else {
            return;
        };

        let times = stat.to_seconds(self.procfs.clock_ticks());
        let group = times
            .fields()
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::Seconds(*v)))
            .collect();
        snapshot.insert("cpu", FieldValue::Group(group));

        let host_uptime = std::fs::read_to_string(self.procfs.uptime_path())
            .ok()
            .and_then(|c| parse_uptime_content(&c));
        if let Some(host_uptime) = host_uptime {
            snapshot.insert("uptime", FieldValue::Seconds(times.age(host_uptime)));
        }
    }

    fn collect_descriptors(&self, pid: &str, snapshot: &mut ProcessSnapshot) {
        let listing = self.read_source(pid, "fd", snapshot, |p| {
            std::fs::read_dir(p)?
                .map(|entry| entry.map(|e| e.file_name()))
                .collect::<io::Result<Vec<_>>>()
        });
        let names = match listing {
            Read::Ok(names) => names,
            Read::Denied => {
                snapshot.insert("fd_count", FieldValue::Denied);
                return;
            }
            Read::Missing => return,
        };

        let Some(fd_dir) = self.procfs.source(pid, "fd") else {
            return;
        };
        let details = names
            .iter()
            .take(self.fd_limit)
            .filter_map(|name| {
                let target = std::fs::read_link(fd_dir.join(name)).ok()?;
                Some((
                    name.to_string_lossy().into_owned(),
                    target.to_string_lossy().into_owned(),
                ))
            })
            .collect();

        snapshot.insert("fd_count", FieldValue::Count(names.len() as u64));
        snapshot.insert("fd_details", FieldValue::Descriptors(details));
    }

    fn collect_io(&self, pid: &str, snapshot: &mut ProcessSnapshot) {
        let Some(path) = self.procfs.source(pid, "io") else {
            return;
        };
        if !path.exists() {
            return;
        }
        let value = match std::fs::read_to_string(&path) {
            Ok(content) => FieldValue::Group(
                parse_key_values(&content)
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::Text(v)))
                    .collect(),
            ),
            Err(_) => FieldValue::Text(IO_UNREADABLE.to_string()),
        };
        snapshot.insert("io", value);
    }
}
