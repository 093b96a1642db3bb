//! Request and response types for the splitting and completion API.
//!
//! Everything here is plain data: serializable with serde and described with
//! JSON schema, so the same shapes can be fed from fixtures or a CLI.

mod common;
mod completion;
mod metadata;
mod request;
mod split;

pub use common::Span;
pub use completion::{Candidate, CandidateKind, TableReference};
pub use metadata::{ColumnMetadata, DatabaseMetadata, SchemaMetadata, TableMetadata};
pub use request::{CompletionRequest, Dialect, Scene, DEFAULT_SCHEMA};
pub use split::SingleSql;
