//! Output formatting modules.

pub mod json;
pub mod table;

use serde::Serialize;
use sqlcaret_core::SingleSql;

pub use json::format_json;
pub use table::{format_candidates, format_statements};

/// Statements split out of one input.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatements {
    pub name: String,
    pub statements: Vec<SingleSql>,
}
