//! Statement splitting and caret completion for PostgreSQL-family SQL.
//!
//! [`split_sql`] cuts a script into statements while keeping procedural
//! blocks whole. [`complete`] lists what may be typed at a caret: keywords,
//! functions, and the relations and columns in scope, resolved through a
//! [`MetadataProvider`].

pub mod completion;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod metadata;
pub mod registry;
pub mod scanner;
pub mod splitter;
pub mod types;

pub use completion::MAX_SQL_LENGTH;
pub use error::{
    CompletionError, MetadataError, ParseError, ParseErrorKind, Position, SplitError,
};
pub use metadata::{MetadataProvider, NoMetadata, StaticMetadata};
pub use types::{
    Candidate, CandidateKind, ColumnMetadata, CompletionRequest, DatabaseMetadata, Dialect,
    Scene, SchemaMetadata, SingleSql, Span, TableMetadata, TableReference, DEFAULT_SCHEMA,
};

/// Splits `sql` into statements with the splitter registered for `dialect`.
pub fn split_sql(sql: &str, dialect: Dialect) -> Result<Vec<SingleSql>, SplitError> {
    registry::splitter(dialect)(sql)
}

/// Completes `request` with the completer registered for its dialect.
pub fn complete(
    request: &CompletionRequest,
    metadata: &dyn MetadataProvider,
) -> Result<Vec<Candidate>, CompletionError> {
    registry::completer(request.dialect)(request, metadata)
}
