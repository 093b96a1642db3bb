//! Isolated parses of `FROM` fragments and CTE definitions.
//!
//! Fragments are cut from the statement being edited, which is usually
//! incomplete. Each one gets its own parser instance and is read only as
//! far as it makes sense; the rest is skipped.

use sqlparser::ast::{Expr, Query, SelectItem, SetExpr, TableAlias, TableFactor, TableWithJoins};
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token as SqlToken;

use super::identifiers::{normalize_ident, normalize_identifier};
use crate::error::ParseError;
use crate::grammar::Kw;
use crate::lexer::{Token, TokenType};
use crate::types::{Dialect, TableReference};

/// Deepest nesting of parenthesized joins followed.
const MAX_NESTED_JOIN_DEPTH: usize = 16;

/// Parses the table references of `text`, which starts with `FROM`.
///
/// The list is read up to the first clause keyword, `;` or unbalanced `)`.
/// Fails only when not even the first table reference parses.
pub(crate) fn parse_from_fragment(
    text: &str,
    dialect: Dialect,
) -> Result<Vec<TableReference>, ParseError> {
    let sqlparser_dialect = dialect.to_sqlparser_dialect();
    let mut parser = Parser::new(sqlparser_dialect.as_ref()).try_with_sql(text)?;
    parser.expect_keyword(Keyword::FROM)?;

    let mut references = Vec::new();
    let first = parser.parse_table_factor()?;
    collect_factor(&first, &mut references, 0);

    while skip_to_next_factor(&mut parser) {
        match parser.parse_table_factor() {
            Ok(factor) => collect_factor(&factor, &mut references, 0),
            Err(_) => break,
        }
    }

    Ok(references)
}

/// Moves past join conditions and separators to the next table reference.
/// Returns false when the list ends.
fn skip_to_next_factor(parser: &mut Parser<'_>) -> bool {
    let mut depth = 0usize;
    loop {
        let token = parser.peek_token().token;
        match token {
            SqlToken::EOF => return false,
            SqlToken::SemiColon if depth == 0 => return false,
            SqlToken::LParen => depth += 1,
            SqlToken::RParen => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            SqlToken::Comma if depth == 0 => {
                parser.next_token();
                return true;
            }
            SqlToken::Word(word) if depth == 0 && word.quote_style.is_none() => match word.keyword {
                Keyword::JOIN => {
                    parser.next_token();
                    return true;
                }
                Keyword::WHERE
                | Keyword::GROUP
                | Keyword::ORDER
                | Keyword::HAVING
                | Keyword::LIMIT
                | Keyword::OFFSET
                | Keyword::UNION
                | Keyword::EXCEPT
                | Keyword::INTERSECT
                | Keyword::WINDOW
                | Keyword::FETCH
                | Keyword::RETURNING => return false,
                _ => {}
            },
            _ => {}
        }
        parser.next_token();
    }
}

fn collect_factor(factor: &TableFactor, references: &mut Vec<TableReference>, depth: usize) {
    if depth > MAX_NESTED_JOIN_DEPTH {
        return;
    }

    match factor {
        TableFactor::Table { name, alias, .. } => {
            let parts: Option<Vec<String>> = name
                .0
                .iter()
                .map(|part| part.as_ident().map(normalize_ident))
                .collect();
            let Some(reference) = parts.and_then(TableReference::from_name_parts) else {
                return;
            };
            let (alias, columns) = split_alias(alias.as_ref());
            references.push(reference.with_alias(alias, columns));
        }
        TableFactor::Derived {
            subquery,
            alias: Some(alias),
            ..
        } => {
            let (name, mut columns) = split_alias(Some(alias));
            if columns.is_empty() {
                columns = projected_columns(subquery);
            }
            if let Some(table) = name {
                references.push(TableReference::Virtual { table, columns });
            }
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => collect_joins(table_with_joins, references, depth + 1),
        _ => {}
    }
}

fn collect_joins(joins: &TableWithJoins, references: &mut Vec<TableReference>, depth: usize) {
    collect_factor(&joins.relation, references, depth);
    for join in &joins.joins {
        collect_factor(&join.relation, references, depth);
    }
}

fn split_alias(alias: Option<&TableAlias>) -> (Option<String>, Vec<String>) {
    match alias {
        Some(alias) => (
            Some(normalize_ident(&alias.name)),
            alias
                .columns
                .iter()
                .map(|column| normalize_ident(&column.name))
                .collect(),
        ),
        None => (None, Vec::new()),
    }
}

/// Output column names of a query. Set operations take the left side's
/// names, which also covers the anchor of a recursive CTE.
pub(crate) fn projected_columns(query: &Query) -> Vec<String> {
    let mut body = query.body.as_ref();
    loop {
        match body {
            SetExpr::SetOperation { left, .. } => body = left.as_ref(),
            SetExpr::Query(inner) => body = inner.body.as_ref(),
            SetExpr::Select(select) => {
                return select.projection.iter().filter_map(select_item_name).collect()
            }
            _ => return Vec::new(),
        }
    }
}

fn select_item_name(item: &SelectItem) -> Option<String> {
    match item {
        SelectItem::ExprWithAlias { alias, .. } => Some(normalize_ident(alias)),
        SelectItem::UnnamedExpr(expr) => expr_name(expr),
        _ => None,
    }
}

fn expr_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(normalize_ident(ident)),
        Expr::CompoundIdentifier(parts) => parts.last().map(normalize_ident),
        Expr::Function(func) => func
            .name
            .0
            .last()
            .and_then(|part| part.as_ident())
            .map(normalize_ident),
        Expr::Cast { expr, .. } | Expr::Nested(expr) => expr_name(expr),
        _ => None,
    }
}

/// A CTE as written: its name and output columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CteDefinition {
    pub name: String,
    pub columns: Vec<String>,
}

impl CteDefinition {
    pub fn to_reference(&self) -> TableReference {
        TableReference::Virtual {
            table: self.name.clone(),
            columns: self.columns.clone(),
        }
    }
}

/// Reads `name [(columns)] AS [NOT] [MATERIALIZED] ( body )` starting at
/// stream index `start`. The body is parsed for its columns only when no
/// column list was given; an unparsable body leaves the columns empty.
pub(crate) fn parse_cte(tokens: &[Token], start: usize, dialect: Dialect) -> Option<CteDefinition> {
    let significant: Vec<&Token> = tokens
        .get(start..)?
        .iter()
        .filter(|t| !t.is_hidden())
        .collect();
    let mut cursor = significant.iter().copied().peekable();

    let name_token = cursor.next().filter(|t| t.token_type.is_identifier())?;
    let name = normalize_identifier(&name_token.text);

    let mut declared = Vec::new();
    if cursor.peek().map(|t| t.token_type) == Some(TokenType::LParen) {
        cursor.next();
        loop {
            let token = cursor.next()?;
            match token.token_type {
                TokenType::RParen => break,
                TokenType::Comma => {}
                t if t.is_identifier() => declared.push(normalize_identifier(&token.text)),
                _ => return None,
            }
        }
    }

    if cursor.next()?.token_type != TokenType::Keyword(Kw::As) {
        return None;
    }
    if cursor.peek().map(|t| t.token_type) == Some(TokenType::Keyword(Kw::Not)) {
        cursor.next();
    }
    if cursor.peek().map(|t| t.token_type) == Some(TokenType::Keyword(Kw::Materialized)) {
        cursor.next();
    }
    let open = cursor.next().filter(|t| t.token_type == TokenType::LParen)?;

    if !declared.is_empty() {
        return Some(CteDefinition {
            name,
            columns: declared,
        });
    }

    let mut depth = 0usize;
    let mut close = None;
    for token in cursor {
        match token.token_type {
            TokenType::LParen => depth += 1,
            TokenType::RParen if depth == 0 => {
                close = Some(token.index);
                break;
            }
            TokenType::RParen => depth -= 1,
            _ => {}
        }
    }

    let columns = close
        .map(|close| {
            tokens[open.index + 1..close]
                .iter()
                .map(|t| t.text.as_str())
                .collect::<String>()
        })
        .and_then(|body| parse_query(&body, dialect))
        .map(|query| projected_columns(&query))
        .unwrap_or_default();

    Some(CteDefinition { name, columns })
}

fn parse_query(sql: &str, dialect: Dialect) -> Option<Box<Query>> {
    let sqlparser_dialect = dialect.to_sqlparser_dialect();
    let mut parser = Parser::new(sqlparser_dialect.as_ref())
        .try_with_sql(sql)
        .ok()?;
    parser.parse_query().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn fragment(text: &str) -> Vec<TableReference> {
        parse_from_fragment(text, Dialect::Postgres).unwrap()
    }

    #[test]
    fn test_fragment_with_alias() {
        assert_eq!(
            fragment("FROM t1 c"),
            vec![TableReference::physical("t1").with_alias(Some("c".into()), Vec::new())]
        );
    }

    #[test]
    fn test_fragment_stops_at_clause_keyword() {
        let refs = fragment("FROM sales.orders o, Customers WHERE o.id = 1 GROUP BY x");
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs[0],
            TableReference::from_name_parts(vec!["sales".into(), "orders".into()])
                .unwrap()
                .with_alias(Some("o".into()), Vec::new())
        );
        assert_eq!(refs[1], TableReference::physical("customers"));
    }

    #[test]
    fn test_fragment_follows_joins() {
        let refs = fragment(
            "FROM a LEFT OUTER JOIN b ON a.id = b.id AND b.x IN (SELECT 1 FROM z) JOIN \"C\" USING (id)",
        );
        let names: Vec<&str> = refs.iter().map(|r| r.visible_name()).collect();
        assert_eq!(names, vec!["a", "b", "C"]);
    }

    #[test]
    fn test_fragment_derived_table() {
        let refs = fragment("FROM (SELECT id, name AS label, count(*) FROM t2) s WHERE");
        assert_eq!(
            refs,
            vec![TableReference::Virtual {
                table: "s".into(),
                columns: vec!["id".into(), "label".into(), "count".into()],
            }]
        );
    }

    #[test]
    fn test_fragment_derived_table_column_aliases() {
        let refs = fragment("FROM (SELECT 1, 2) AS s(a, b)");
        assert_eq!(
            refs,
            vec![TableReference::Virtual {
                table: "s".into(),
                columns: vec!["a".into(), "b".into()],
            }]
        );
    }

    #[test]
    fn test_fragment_stops_at_closing_paren() {
        let refs = fragment("FROM t2) s WHERE x");
        assert_eq!(refs, vec![TableReference::physical("t2")]);
    }

    #[test]
    fn test_fragment_keeps_prefix_of_broken_list() {
        let refs = fragment("FROM t1, ");
        assert_eq!(refs, vec![TableReference::physical("t1")]);
    }

    #[test]
    fn test_fragment_too_many_name_parts_dropped() {
        assert!(fragment("FROM a.b.c.d").is_empty());
    }

    #[test]
    fn test_malformed_fragment_fails() {
        assert!(parse_from_fragment("FROM , t", Dialect::Postgres).is_err());
        assert!(parse_from_fragment("SELECT 1", Dialect::Postgres).is_err());
    }

    fn cte_at(sql: &str, name: &str) -> Option<CteDefinition> {
        let tokens = tokenize(sql, Dialect::Postgres);
        let start = tokens.iter().find(|t| t.text == name).unwrap().index;
        parse_cte(&tokens, start, Dialect::Postgres)
    }

    #[test]
    fn test_cte_columns_from_body() {
        let sql = "WITH totals AS (SELECT o.id, sum(o.amount) AS total FROM orders o) SELECT 1";
        assert_eq!(
            cte_at(sql, "totals"),
            Some(CteDefinition {
                name: "totals".into(),
                columns: vec!["id".into(), "total".into()],
            })
        );
    }

    #[test]
    fn test_cte_declared_columns_win() {
        let sql = "WITH t(a, b) AS MATERIALIZED (SELECT 1, 2) SELECT 1";
        assert_eq!(cte_at(sql, "t").unwrap().columns, vec!["a", "b"]);
    }

    #[test]
    fn test_recursive_cte_uses_anchor() {
        let sql = "WITH RECURSIVE r AS (SELECT 1 AS n UNION ALL SELECT n + 1 FROM r) SELECT 1";
        assert_eq!(cte_at(sql, "r").unwrap().columns, vec!["n"]);
    }

    #[test]
    fn test_unfinished_cte_has_no_columns() {
        let sql = "WITH t AS (SELECT a, FROM";
        assert_eq!(
            cte_at(sql, "t"),
            Some(CteDefinition {
                name: "t".into(),
                columns: Vec::new(),
            })
        );
    }
}
