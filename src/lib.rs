//! stepdriver - scenario execution engine
//!
//! Executes the scenarios of a spec against an external step-implementation
//! runner: data store setup, lifecycle hooks, concept expansion, recoverable
//! and fatal step failures, optional manual execution and parallel streams.

pub mod cli;
pub mod commands;
pub mod common;
pub mod document;
pub mod event;
pub mod execution;
pub mod model;
pub mod runner;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use runner::protocol::{ExecutionResult, Message, Request, Response};
