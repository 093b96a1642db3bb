use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Span;

/// One statement cut out of a script.
///
/// Lines are 0-based and columns are 0-based character offsets. `text` keeps
/// leading whitespace and comments, so joining every statement's `text` in
/// order gives back the original input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SingleSql {
    pub text: String,
    /// Line on which `text` begins.
    pub base_line: usize,
    /// Line of the terminating `;`, or of the last significant token when
    /// the statement is not terminated.
    pub last_line: usize,
    /// Column of the same token as `last_line`.
    pub last_column: usize,
    /// Position of the first non-hidden token.
    pub first_statement_line: usize,
    pub first_statement_column: usize,
    /// True when the statement holds nothing but a terminator.
    pub empty: bool,
    /// Byte range of `text` within the input.
    pub span: Span,
}
