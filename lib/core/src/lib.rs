//! Core domain types and utilities for steward.
//!
//! This crate provides the identifiers and the error-handling foundation
//! shared by the task orchestration and conversation crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{MessageId, ParseIdError, SessionId, TaskId};
