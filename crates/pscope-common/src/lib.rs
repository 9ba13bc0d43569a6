//! procscope common types and errors.
//!
//! This crate provides the values shared across pscope-core modules:
//! - Process references as produced by the process listing
//! - The error taxonomy every component converts its failures into

pub mod error;
pub mod id;

pub use error::{Error, ErrorCategory, Result};
pub use id::{is_numeric_pid, ProcessRef};
