//! Discovery of the relations visible at the caret.
//!
//! Two scans over the token stream find every `FROM` clause that can
//! contribute names to the caret position. Parentheses open and close
//! reference scopes, so a subquery's tables stay inside the subquery.

#[cfg(feature = "tracing")]
use tracing::debug;

use super::fragments::parse_from_fragment;
use crate::grammar::Kw;
use crate::lexer::TokenType;
use crate::scanner::Scanner;
use crate::types::{Dialect, TableReference};

/// Stack of reference scopes, outermost first.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReferenceScopes {
    scopes: Vec<Vec<TableReference>>,
}

impl ReferenceScopes {
    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn extend_innermost(&mut self, references: Vec<TableReference>) {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.extend(references);
        }
    }

    /// Every visible reference, outer scopes first, in encounter order.
    pub fn flatten(&self) -> Vec<TableReference> {
        self.scopes.iter().flatten().cloned().collect()
    }
}

/// Walks from the start of the statement to the caret. Each `(` opens a
/// scope and each `)` closes one; every `FROM` adds its tables to the
/// innermost open scope. A `)` closing more than was opened means the caret
/// is not where the scan expects it, and the scan stops.
pub(crate) fn collect_leading_references(
    scanner: &mut Scanner,
    caret_index: usize,
    scopes: &mut ReferenceScopes,
    dialect: Dialect,
) {
    scanner.speculate(|scanner| {
        scanner.seek_index(0);
        let mut level = 0usize;
        while scanner.index() < caret_index {
            match scanner.token_type() {
                TokenType::LParen => {
                    level += 1;
                    scopes.push_scope();
                }
                TokenType::RParen => {
                    if level == 0 {
                        return;
                    }
                    level -= 1;
                    scopes.pop_scope();
                }
                TokenType::Keyword(Kw::From) => add_fragment(scanner, scopes, dialect),
                _ => {}
            }
            if !scanner.forward(false) {
                break;
            }
        }
    });
}

/// Walks from the caret to the end of the statement, picking up `FROM`
/// clauses at the caret's own nesting level. These are the tables of a
/// select list typed before its `FROM`.
pub(crate) fn collect_trailing_references(
    scanner: &mut Scanner,
    caret_index: usize,
    scopes: &mut ReferenceScopes,
    dialect: Dialect,
) {
    scanner.speculate(|scanner| {
        scanner.seek_index(caret_index);
        let mut level = 0usize;
        loop {
            match scanner.token_type() {
                TokenType::LParen => level += 1,
                TokenType::RParen => level = level.saturating_sub(1),
                TokenType::SemiColon if level == 0 => break,
                TokenType::Keyword(Kw::From) if level == 0 => {
                    add_fragment(scanner, scopes, dialect)
                }
                _ => {}
            }
            if !scanner.forward(false) {
                break;
            }
        }
    });
}

fn add_fragment(scanner: &Scanner, scopes: &mut ReferenceScopes, dialect: Dialect) {
    let text = scanner.following_text();
    match parse_from_fragment(&text, dialect) {
        Ok(references) => scopes.extend_innermost(references),
        Err(_err) => {
            #[cfg(feature = "tracing")]
            debug!(error = %_err, index = scanner.index(), "skipping unparsable FROM fragment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    /// References visible at the `|` marker in `sql`.
    fn visible(sql_with_caret: &str) -> Vec<TableReference> {
        let caret = sql_with_caret.find('|').unwrap();
        let sql = sql_with_caret.replacen('|', "", 1);
        let tokens = tokenize(&sql, Dialect::Postgres);
        let caret_index = tokens
            .iter()
            .position(|t| t.start >= caret)
            .unwrap_or(tokens.len() - 1);
        let mut scanner = Scanner::new(tokens);
        let mut scopes = ReferenceScopes::default();
        scopes.push_scope();
        collect_leading_references(&mut scanner, caret_index, &mut scopes, Dialect::Postgres);
        collect_trailing_references(&mut scanner, caret_index, &mut scopes, Dialect::Postgres);
        assert_eq!(scanner.index(), 0);
        scopes.flatten()
    }

    #[test]
    fn test_select_list_sees_following_from() {
        assert_eq!(
            visible("SELECT c.| FROM t1 c"),
            vec![TableReference::physical("t1").with_alias(Some("c".into()), Vec::new())]
        );
    }

    #[test]
    fn test_subquery_tables_stay_inside() {
        let refs = visible("SELECT * FROM (SELECT * FROM t2) s WHERE |");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].visible_name(), "s");
    }

    #[test]
    fn test_subquery_sees_outer_and_own_tables() {
        let refs = visible("SELECT * FROM t1 WHERE x IN (SELECT | FROM t2)");
        let names: Vec<&str> = refs.iter().map(|r| r.visible_name()).collect();
        assert_eq!(names, vec!["t1", "t2"]);
    }

    #[test]
    fn test_trailing_scan_stops_at_statement_end() {
        let refs = visible("SELECT | FROM t1; SELECT * FROM t2");
        assert_eq!(refs, vec![TableReference::physical("t1")]);
    }

    #[test]
    fn test_unbalanced_paren_stops_leading_scan() {
        let refs = visible("SELECT 1) FROM t1 WHERE |");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_scope_stack() {
        let mut scopes = ReferenceScopes::default();
        scopes.push_scope();
        scopes.extend_innermost(vec![TableReference::physical("a")]);
        scopes.push_scope();
        scopes.extend_innermost(vec![TableReference::physical("b")]);
        assert_eq!(scopes.depth(), 2);
        assert_eq!(scopes.flatten().len(), 2);
        scopes.pop_scope();
        assert_eq!(scopes.flatten(), vec![TableReference::physical("a")]);
    }
}
