//! Process discovery and fact collection.
//!
//! This module is the data layer of the inspector:
//! - Process directory via `ps`/`tasklist` (enumeration and search)
//! - Fact collection from the `/proc` tree (one snapshot per pid)
//! - Section resolution for the advanced detail categories
//! - Tool runner for bounded external command execution
//!
//! Everything here is synchronous and uncached; callers re-invoke to
//! refresh.

pub mod proc_parsers;
pub mod process_list;
pub mod procfs;
pub mod sections;
pub mod snapshot;
pub mod tool_runner;

pub use process_list::{search, Platform, ProcessDirectory, ProcessListing, ProcessSource};
pub use procfs::{ProcFs, DEFAULT_PROC_ROOT};
pub use sections::{resolve, SectionCategory};
pub use snapshot::{FactCollector, FieldValue, ProcessSnapshot, DEFAULT_FD_DETAIL_LIMIT};
pub use tool_runner::{find_in_path, ToolConfig, ToolError, ToolOutput, ToolRunner};
