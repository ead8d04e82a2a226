//! apicheck - declarative API test runner
//!
//! This library loads test and server definitions, runs them concurrently
//! against live HTTP servers, and reports per-file results.

pub mod capture;
pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod compare;
pub mod definitions;
pub mod runner;

// Re-export commonly used types for tests
pub use common::config::{DispatchMode, RunConfig};
pub use common::{Error, Result};
pub use runner::{run, FileReport, MemorySink, ReportSink, RunSummary};
