//! Caret completion for the PostgreSQL-family grammar.
//!
//! A request is narrowed to the statement holding the caret, the caret is
//! mapped onto a token, and the follow-set collector reports which tokens
//! and name rules may appear there. Name rules are then resolved against
//! the statement's own relations and the metadata provider.

mod candidates;
pub mod collector;
mod fragments;
mod functions;
pub mod identifiers;
mod references;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::sync::OnceLock;

#[cfg(feature = "tracing")]
use tracing::{debug, info_span};

use self::collector::{CodeCompletionCore, CollectorConfig, FollowSetsByState};
use self::fragments::CteDefinition;
use self::references::{collect_leading_references, collect_trailing_references, ReferenceScopes};
use crate::error::CompletionError;
use crate::grammar::{atn, Kw, Rule};
use crate::lexer::{tokenize, TokenType};
use crate::metadata::MetadataProvider;
use crate::scanner::Scanner;
use crate::splitter;
use crate::types::{
    Candidate, CompletionRequest, DatabaseMetadata, Dialect, Scene, TableReference,
};

/// Largest input accepted for completion, in bytes.
pub const MAX_SQL_LENGTH: usize = 10 * 1024 * 1024;

/// Follow sets of the PostgreSQL-family grammar, shared by every request.
pub fn follow_sets() -> &'static FollowSetsByState {
    static FOLLOW_SETS: OnceLock<FollowSetsByState> = OnceLock::new();
    FOLLOW_SETS.get_or_init(FollowSetsByState::new)
}

fn collector_config() -> &'static CollectorConfig {
    static CONFIG: OnceLock<CollectorConfig> = OnceLock::new();
    CONFIG.get_or_init(|| {
        use TokenType as T;
        CollectorConfig {
            ignored_tokens: [
                T::Identifier,
                T::QuotedIdentifier,
                T::Number,
                T::String,
                T::Placeholder,
                T::Operator,
                T::Star,
                T::Eq,
                T::Comma,
                T::Period,
                T::LParen,
                T::RParen,
                T::LBracket,
                T::RBracket,
                T::SemiColon,
                T::Colon,
                T::DoubleColon,
                T::Whitespace,
                T::Comment,
                T::Other,
                T::Eof,
            ]
            .into_iter()
            .collect::<HashSet<_>>(),
            preferred_rules: [
                Rule::RelationExpr,
                Rule::QualifiedName,
                Rule::ColumnRef,
                Rule::FuncName,
            ]
            .into_iter()
            .collect::<BTreeSet<_>>(),
            query_rule: Rule::SimpleSelectPrimary,
            shadow_query_rule: Rule::SelectNoParens,
            select_item_alias_rule: Rule::TargetAlias,
            cte_rule: Rule::WithClause,
        }
    })
}

/// Completes `request.sql` at the caret.
///
/// Candidates come back deduplicated and sorted by kind, text and
/// definition. A database unknown to `metadata` only narrows the result; a
/// failing provider or untokenizable input fails the request.
pub fn complete(
    request: &CompletionRequest,
    metadata: &dyn MetadataProvider,
) -> Result<Vec<Candidate>, CompletionError> {
    #[cfg(feature = "tracing")]
    let _span = info_span!(
        "complete",
        len = request.sql.len(),
        line = request.caret_line,
        offset = request.caret_offset
    )
    .entered();

    if request.sql.len() > MAX_SQL_LENGTH {
        return Err(CompletionError::InputTooLarge {
            len: request.sql.len(),
            max: MAX_SQL_LENGTH,
        });
    }

    let (text, line, offset) = skip_heading_statements(
        &request.sql,
        request.caret_line,
        request.caret_offset,
        request.dialect,
    );

    let mut candidates = Completer::new(request, metadata, &text, line, offset).run()?;
    if candidates.is_empty() {
        if let Some((text, line, offset)) =
            skip_heading_select(&text, line, offset, request.dialect)
        {
            #[cfg(feature = "tracing")]
            debug!(line, offset, "no candidates, retrying from line-leading SELECT");
            candidates = Completer::new(request, metadata, &text, line, offset).run()?;
        }
    }

    candidates.sort();
    candidates.dedup();
    Ok(candidates)
}

/// Cuts the statements before the one holding the caret and moves the caret
/// into the remaining text. Input that does not split, or holds a single
/// statement, is returned as is.
pub(crate) fn skip_heading_statements(
    sql: &str,
    caret_line: usize,
    caret_offset: usize,
    dialect: Dialect,
) -> (String, usize, usize) {
    let unchanged = || (sql.to_string(), caret_line, caret_offset);

    let Ok(statements) = splitter::split(sql, dialect) else {
        return unchanged();
    };
    if statements.iter().filter(|s| !s.empty).count() <= 1 {
        return unchanged();
    }

    let caret_line0 = caret_line.saturating_sub(1);
    let current = statements
        .iter()
        .position(|s| {
            s.last_line > caret_line0 || (s.last_line == caret_line0 && s.last_column >= caret_offset)
        })
        .unwrap_or(statements.len() - 1);
    if current == 0 {
        return unchanged();
    }

    let previous = &statements[current - 1];
    let line = caret_line0.saturating_sub(previous.last_line) + 1;
    let offset = if caret_line0 == previous.last_line {
        caret_offset.saturating_sub(previous.last_column + 1)
    } else {
        caret_offset
    };
    let text = statements[current..].iter().map(|s| s.text.as_str()).collect();
    (text, line, offset)
}

/// Cuts the text at the last `SELECT` that starts a line before the caret.
/// Used when a script lacks terminators and the grammar sees one long
/// statement.
pub(crate) fn skip_heading_select(
    sql: &str,
    caret_line: usize,
    caret_offset: usize,
    dialect: Dialect,
) -> Option<(String, usize, usize)> {
    let tokens = tokenize(sql, dialect);
    let select = tokens
        .iter()
        .filter(|t| t.token_type == TokenType::Keyword(Kw::Select) && t.column == 0)
        .filter(|t| (t.line, t.column) < (caret_line, caret_offset))
        .last()?;
    if select.start == 0 {
        return None;
    }
    Some((
        sql[select.start..].to_string(),
        caret_line - select.line + 1,
        caret_offset,
    ))
}

/// State of one completion pass over one statement text.
struct Completer<'a> {
    dialect: Dialect,
    scene: Scene,
    default_database: &'a str,
    default_schema: Option<&'a str>,
    metadata: &'a dyn MetadataProvider,
    database: Option<Option<Rc<DatabaseMetadata>>>,
    scanner: Scanner,
    caret_index: usize,
    caret_token_is_quoted: bool,
    scopes: ReferenceScopes,
    references: Vec<TableReference>,
    ctes: HashMap<usize, Option<CteDefinition>>,
}

impl<'a> Completer<'a> {
    fn new(
        request: &'a CompletionRequest,
        metadata: &'a dyn MetadataProvider,
        text: &str,
        caret_line: usize,
        caret_offset: usize,
    ) -> Self {
        let tokens = tokenize(text, request.dialect);
        let mut scanner = Scanner::new(tokens);
        scanner.seek_position(caret_line, caret_offset);
        let caret_token_is_quoted = scanner.token_type() == TokenType::QuotedIdentifier;

        // The caret belongs to the token before it unless a separator ends
        // right there.
        let mut caret_index = scanner.index();
        if !scanner
            .previous_token_type(false)
            .is_some_and(TokenType::is_separator)
        {
            caret_index = caret_index.saturating_sub(1);
        }
        scanner.seek_index(caret_index);

        let mut scopes = ReferenceScopes::default();
        scopes.push_scope();

        Self {
            dialect: request.dialect,
            scene: request.scene,
            default_database: &request.default_database,
            default_schema: request.default_schema.as_deref(),
            metadata,
            database: None,
            scanner,
            caret_index,
            caret_token_is_quoted,
            scopes,
            references: Vec::new(),
            ctes: HashMap::new(),
        }
    }

    fn run(&mut self) -> Result<Vec<Candidate>, CompletionError> {
        let start_rule = match self.scene {
            Scene::Query => Rule::SelectStmt,
            Scene::All => Rule::Root,
        };

        let mut core = CodeCompletionCore::new(atn(), collector_config(), follow_sets());
        let collection =
            core.collect_candidates(self.scanner.tokens(), self.caret_index, start_rule, 0);

        if collection.rules.contains_key(&Rule::ColumnRef) {
            self.resolve_references();
        }
        self.convert_candidates(&collection)
    }

    /// Fills `references` with the leading scan's result followed by what
    /// the trailing scan added.
    fn resolve_references(&mut self) {
        collect_leading_references(
            &mut self.scanner,
            self.caret_index,
            &mut self.scopes,
            self.dialect,
        );
        let mut references = self.scopes.flatten();

        collect_trailing_references(
            &mut self.scanner,
            self.caret_index,
            &mut self.scopes,
            self.dialect,
        );
        for reference in self.scopes.flatten() {
            if !references.contains(&reference) {
                references.push(reference);
            }
        }

        self.references = references;
    }

    /// Catalog of the default database, fetched once per pass.
    fn database(&mut self) -> Result<Option<Rc<DatabaseMetadata>>, CompletionError> {
        if let Some(database) = &self.database {
            return Ok(database.clone());
        }
        let found = self.metadata.database(self.default_database)?.map(Rc::new);
        #[cfg(feature = "tracing")]
        if found.is_none() {
            debug!(database = self.default_database, "database not found");
        }
        self.database = Some(found.clone());
        Ok(found)
    }

    /// CTEs defined by the queries on `path`, each parsed once.
    fn ctes_in_path(&mut self, path: &[collector::RuleContext]) -> Vec<CteDefinition> {
        let mut result: Vec<CteDefinition> = Vec::new();
        for context in path.iter().filter(|c| c.rule == Rule::SelectNoParens) {
            for &start in &context.ctes {
                let tokens = self.scanner.tokens();
                let dialect = self.dialect;
                let definition = self
                    .ctes
                    .entry(start)
                    .or_insert_with(|| fragments::parse_cte(tokens, start, dialect));
                if let Some(definition) = definition {
                    if !result.iter().any(|d| d.name == definition.name) {
                        result.push(definition.clone());
                    }
                }
            }
        }
        result
    }
}
