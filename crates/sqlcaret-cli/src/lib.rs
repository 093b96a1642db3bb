//! sqlcaret CLI library
//!
//! This module exposes the CLI components for testing.

pub mod cli;
pub mod input;
pub mod metadata;
pub mod output;
