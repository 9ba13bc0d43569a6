//! procscope core library.
//!
//! An interactive inspector for live processes:
//! - Process enumeration and search
//! - Fact collection from a `/proc` tree
//! - Advanced section resolution (maps, descriptors, links, limits)
//! - Live output monitoring through a tracer subprocess
//! - A stack of terminal screens tying the above together
//!
//! The binary entry point is in `main.rs`.

pub mod collect;
pub mod config;
pub mod exit_codes;
pub mod logging;
pub mod monitor;
pub mod tui;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
