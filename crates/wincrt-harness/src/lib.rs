//! Conformance testing harness for wincrt.
//!
//! This crate provides:
//! - Fixture replay: scripted register/drain cases checked against expected order
//! - Structured JSONL logging with an artifact index for each run
//! - Log validation for CI gates

#![forbid(unsafe_code)]

pub mod fixtures;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use fixtures::{FixtureCase, FixtureSet};
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
