//! Engine-keyed entry points.
//!
//! Every engine maps to a splitter and a completer with the same contract.
//! PostgreSQL and Redshift share the grammar and differ in tokenizer and
//! parser dialect.

use std::borrow::Cow;

use crate::completion;
use crate::error::{CompletionError, SplitError};
use crate::metadata::MetadataProvider;
use crate::splitter;
use crate::types::{Candidate, CompletionRequest, Dialect, SingleSql};

/// Registry key.
pub type Engine = Dialect;

pub type SplitFn = fn(&str) -> Result<Vec<SingleSql>, SplitError>;

pub type CompleteFn =
    fn(&CompletionRequest, &dyn MetadataProvider) -> Result<Vec<Candidate>, CompletionError>;

pub fn splitter(engine: Engine) -> SplitFn {
    match engine {
        Engine::Postgres => split_postgres,
        Engine::Redshift => split_redshift,
    }
}

pub fn completer(engine: Engine) -> CompleteFn {
    match engine {
        Engine::Postgres => complete_postgres,
        Engine::Redshift => complete_redshift,
    }
}

fn split_postgres(sql: &str) -> Result<Vec<SingleSql>, SplitError> {
    splitter::split(sql, Dialect::Postgres)
}

fn split_redshift(sql: &str) -> Result<Vec<SingleSql>, SplitError> {
    splitter::split(sql, Dialect::Redshift)
}

fn complete_postgres(
    request: &CompletionRequest,
    metadata: &dyn MetadataProvider,
) -> Result<Vec<Candidate>, CompletionError> {
    completion::complete(&for_engine(request, Dialect::Postgres), metadata)
}

fn complete_redshift(
    request: &CompletionRequest,
    metadata: &dyn MetadataProvider,
) -> Result<Vec<Candidate>, CompletionError> {
    completion::complete(&for_engine(request, Dialect::Redshift), metadata)
}

fn for_engine(request: &CompletionRequest, dialect: Dialect) -> Cow<'_, CompletionRequest> {
    if request.dialect == dialect {
        Cow::Borrowed(request)
    } else {
        Cow::Owned(request.clone().with_dialect(dialect))
    }
}
