//! Turning collected tokens and rules into candidates.

use super::collector::{CandidatesCollection, RuleContext};
use super::fragments::CteDefinition;
use super::functions::function_candidates;
use super::identifiers::{normalize_identifier, quote_identifier_if_needed};
use super::Completer;
use crate::error::CompletionError;
use crate::grammar::{Kw, Rule};
use crate::lexer::TokenType;
use crate::types::{
    Candidate, CandidateKind, ColumnMetadata, DatabaseMetadata, SchemaMetadata, TableMetadata,
    TableReference, DEFAULT_SCHEMA,
};

impl Completer<'_> {
    pub(super) fn convert_candidates(
        &mut self,
        collection: &CandidatesCollection,
    ) -> Result<Vec<Candidate>, CompletionError> {
        let mut result = Vec::new();

        for (token_type, following) in &collection.tokens {
            let TokenType::Keyword(kw) = token_type else {
                continue;
            };
            let mut text = kw.as_str().to_string();
            for next in following {
                let TokenType::Keyword(next) = next else {
                    break;
                };
                text.push(' ');
                text.push_str(next.as_str());
            }
            result.push(Candidate::new(CandidateKind::Keyword, text));
        }

        for (rule, path) in &collection.rules {
            match rule {
                Rule::FuncName => {
                    if self.qualifier().is_empty() {
                        result.extend(function_candidates());
                    }
                }
                Rule::RelationExpr | Rule::QualifiedName => {
                    let ctes = self.ctes_in_path(path);
                    result.extend(self.relation_candidates(&ctes)?);
                }
                Rule::ColumnRef => {
                    let ctes = self.ctes_in_path(path);
                    result.extend(self.column_candidates(path, &ctes)?);
                }
                _ => {}
            }
        }

        Ok(result)
    }

    /// Normalized name parts written before the caret, as in `schema.` or
    /// `alias.col`.
    fn qualifier(&self) -> Vec<String> {
        let tokens = self.scanner.tokens();
        let mut parts = Vec::new();
        let mut i = self.caret_index;
        while i >= 2
            && tokens[i - 1].token_type == TokenType::Period
            && is_word(tokens[i - 2].token_type)
        {
            parts.push(normalize_identifier(&tokens[i - 2].text));
            i -= 2;
        }
        parts.reverse();
        parts
    }

    /// Inside a quoted identifier the user types the quotes.
    fn name(&self, raw: &str) -> String {
        if self.caret_token_is_quoted {
            raw.to_string()
        } else {
            quote_identifier_if_needed(raw)
        }
    }

    fn relation_candidates(
        &mut self,
        ctes: &[CteDefinition],
    ) -> Result<Vec<Candidate>, CompletionError> {
        let parts = self.qualifier();
        let schema = match parts.as_slice() {
            [] => None,
            [schema] => Some(schema.clone()),
            [database, schema] if *database == self.default_database => Some(schema.clone()),
            _ => return Ok(Vec::new()),
        };

        let mut result = Vec::new();
        if let Some(database) = self.database()? {
            match &schema {
                Some(name) => {
                    if let Some(schema) = database.schema(name) {
                        result.extend(self.schema_relations(schema, None));
                    }
                }
                None => {
                    let selected = self.default_schema;
                    if selected.map_or(true, |s| s == DEFAULT_SCHEMA) {
                        for schema in &database.schemas {
                            let text = self.name(&schema.name);
                            result.push(Candidate::new(CandidateKind::Schema, text));
                        }
                    }
                    for schema in &database.schemas {
                        if selected.is_some_and(|s| s != schema.name) {
                            continue;
                        }
                        let prefix = (selected.is_none() && schema.name != DEFAULT_SCHEMA)
                            .then_some(schema.name.as_str());
                        result.extend(self.schema_relations(schema, prefix));
                    }
                }
            }
        }

        if schema.is_none() {
            for cte in ctes {
                result.push(Candidate::new(CandidateKind::Table, self.name(&cte.name)));
            }
        }
        Ok(result)
    }

    fn schema_relations(&self, schema: &SchemaMetadata, prefix: Option<&str>) -> Vec<Candidate> {
        let text = |name: &str| match prefix {
            Some(prefix) => format!("{}.{}", self.name(prefix), self.name(name)),
            None => self.name(name),
        };

        let tables = schema
            .tables
            .iter()
            .map(|table| Candidate::new(CandidateKind::Table, text(&table.name)));
        let foreign = schema
            .foreign_tables
            .iter()
            .map(|name| Candidate::new(CandidateKind::ForeignTable, text(name)));
        let views = schema
            .views
            .iter()
            .map(|name| Candidate::new(CandidateKind::View, text(name)));
        let materialized = schema
            .materialized_views
            .iter()
            .map(|name| Candidate::new(CandidateKind::MaterializedView, text(name)));

        tables.chain(foreign).chain(views).chain(materialized).collect()
    }

    fn column_candidates(
        &mut self,
        path: &[RuleContext],
        ctes: &[CteDefinition],
    ) -> Result<Vec<Candidate>, CompletionError> {
        let parts = self.qualifier();
        let database = self.database()?;
        let database = database.as_deref();
        let references = self.references.clone();
        let mut result = Vec::new();

        match parts.as_slice() {
            [] => {
                for reference in &references {
                    result.push(Candidate::new(
                        CandidateKind::Table,
                        self.name(reference.visible_name()),
                    ));
                    result.extend(self.reference_columns(reference, database, ctes));
                }
                if references.is_empty() {
                    if let Some(database) = database {
                        for schema in self.searched_schemas(database) {
                            for table in &schema.tables {
                                result.extend(self.table_columns(schema, table, &[]));
                            }
                        }
                    }
                } else {
                    for alias in self.select_item_aliases(path) {
                        result.push(
                            Candidate::new(CandidateKind::Column, self.name(&alias))
                                .with_definition("alias"),
                        );
                    }
                }
            }
            [qualifier] => {
                if let Some(reference) = references.iter().find(|r| r.visible_name() == qualifier) {
                    result.extend(self.reference_columns(reference, database, ctes));
                } else if let Some(cte) = ctes.iter().find(|cte| cte.name == *qualifier) {
                    result.extend(self.reference_columns(&cte.to_reference(), database, ctes));
                } else if let Some(database) = database {
                    if let Some((schema, table)) = self.resolve_table(database, None, qualifier) {
                        result.extend(self.table_columns(schema, table, &[]));
                    }
                    if let Some(schema) = database.schema(qualifier) {
                        result.extend(
                            schema
                                .tables
                                .iter()
                                .map(|t| Candidate::new(CandidateKind::Table, self.name(&t.name))),
                        );
                    }
                }
            }
            [schema, table] => {
                if let Some(database) = database {
                    let found = self.resolve_table(database, Some(schema.as_str()), table);
                    if let Some((schema, table)) = found {
                        result.extend(self.table_columns(schema, table, &[]));
                    }
                }
            }
            [db, schema, table] if *db == self.default_database => {
                if let Some(database) = database {
                    let found = self.resolve_table(database, Some(schema.as_str()), table);
                    if let Some((schema, table)) = found {
                        result.extend(self.table_columns(schema, table, &[]));
                    }
                }
            }
            _ => {}
        }

        Ok(result)
    }

    fn reference_columns(
        &self,
        reference: &TableReference,
        database: Option<&DatabaseMetadata>,
        ctes: &[CteDefinition],
    ) -> Vec<Candidate> {
        match reference {
            TableReference::Virtual { table, columns } => self.virtual_columns(table, columns),
            TableReference::Physical {
                database: reference_database,
                schema,
                table,
                column_aliases,
                ..
            } => {
                if reference_database.is_none() && schema.is_none() {
                    if let Some(cte) = ctes.iter().find(|cte| cte.name == *table) {
                        return self.virtual_columns(table, &cte.columns);
                    }
                }
                if reference_database
                    .as_deref()
                    .is_some_and(|name| name != self.default_database)
                {
                    return Vec::new();
                }
                database
                    .and_then(|database| self.resolve_table(database, schema.as_deref(), table))
                    .map(|(schema, table)| self.table_columns(schema, table, column_aliases))
                    .unwrap_or_default()
            }
        }
    }

    fn virtual_columns(&self, table: &str, columns: &[String]) -> Vec<Candidate> {
        columns
            .iter()
            .map(|column| {
                Candidate::new(CandidateKind::Column, self.name(column))
                    .with_definition(format!("{table} | "))
            })
            .collect()
    }

    /// Columns of a catalog table. `renamed` replaces leading column names,
    /// as an alias column list does.
    fn table_columns(
        &self,
        schema: &SchemaMetadata,
        table: &TableMetadata,
        renamed: &[String],
    ) -> Vec<Candidate> {
        table
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let name = renamed.get(i).unwrap_or(&column.name);
                let candidate = Candidate::new(CandidateKind::Column, self.name(name))
                    .with_definition(column_definition(schema, table, column));
                if column.comment.is_empty() {
                    candidate
                } else {
                    candidate.with_comment(column.comment.clone())
                }
            })
            .collect()
    }

    /// Finds `table` in `schema`, or, without a schema, in the selected
    /// schema. With no schema selected `public` is tried first, then every
    /// other schema.
    fn resolve_table<'d>(
        &self,
        database: &'d DatabaseMetadata,
        schema: Option<&str>,
        table: &str,
    ) -> Option<(&'d SchemaMetadata, &'d TableMetadata)> {
        let lookup = |schema: &'d SchemaMetadata| schema.table(table).map(|t| (schema, t));
        if let Some(schema) = schema {
            return database.schema(schema).and_then(lookup);
        }
        let preferred = self.default_schema.unwrap_or(DEFAULT_SCHEMA);
        database.schema(preferred).and_then(lookup).or_else(|| {
            if self.default_schema.is_some() {
                return None;
            }
            database.schemas.iter().find_map(lookup)
        })
    }

    /// Schemas whose tables are offered when nothing narrows the choice.
    fn searched_schemas<'d>(&self, database: &'d DatabaseMetadata) -> Vec<&'d SchemaMetadata> {
        match self.default_schema {
            Some(selected) => database.schema(selected).into_iter().collect(),
            None => database.schemas.iter().collect(),
        }
    }

    /// Aliases of the select list, offered in clauses evaluated after it.
    fn select_item_aliases(&self, path: &[RuleContext]) -> Vec<String> {
        let mut allowed = false;
        for context in path.iter().rev() {
            match context.rule {
                Rule::SortClause | Rule::GroupClause | Rule::HavingClause => allowed = true,
                Rule::SimpleSelectPrimary | Rule::SelectNoParens => {
                    if !allowed {
                        return Vec::new();
                    }
                    let tokens = self.scanner.tokens();
                    let mut aliases: Vec<String> = context
                        .select_item_aliases
                        .iter()
                        .filter_map(|&index| tokens.get(index))
                        .filter(|token| {
                            is_word(token.token_type) && !token.token_type.is_keyword(Kw::As)
                        })
                        .map(|token| normalize_identifier(&token.text))
                        .collect();
                    aliases.sort();
                    aliases.dedup();
                    return aliases;
                }
                _ => {}
            }
        }
        Vec::new()
    }
}

fn is_word(token_type: TokenType) -> bool {
    matches!(
        token_type,
        TokenType::Identifier | TokenType::QuotedIdentifier | TokenType::Keyword(_)
    )
}

/// `schema.table | type`, flagged when the column rejects nulls.
fn column_definition(
    schema: &SchemaMetadata,
    table: &TableMetadata,
    column: &ColumnMetadata,
) -> String {
    let mut definition = format!("{}.{} | {}", schema.name, table.name, column.data_type);
    if !column.nullable {
        definition.push_str(", NOT NULL");
    }
    definition
}
