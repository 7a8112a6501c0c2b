//! Shared test utilities for maintdesk integration tests.
//!
//! This module provides:
//! - `TestHarness` owning an isolated on-disk database
//! - Builders producing request payloads for every document kind

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
