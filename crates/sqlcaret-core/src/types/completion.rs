use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of a completion candidate.
///
/// Declaration order is the order in which groups are presented.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum CandidateKind {
    Keyword,
    Function,
    Database,
    Schema,
    Table,
    ForeignTable,
    View,
    MaterializedView,
    Column,
}

/// One completion suggestion.
///
/// Equality and ordering only look at `(kind, text, definition)`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub kind: CandidateKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub definition: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Candidate {
    pub fn new(kind: CandidateKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            definition: String::new(),
            comment: String::new(),
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    fn key(&self) -> (CandidateKind, &str, &str) {
        (self.kind, &self.text, &self.definition)
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// A relation visible at the caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TableReference {
    /// A catalog relation named by a one, two or three part name.
    #[serde(rename_all = "camelCase")]
    Physical {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        database: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<String>,
        table: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        column_aliases: Vec<String>,
    },
    /// A CTE or an aliased subquery, known only by its name and columns.
    Virtual { table: String, columns: Vec<String> },
}

impl TableReference {
    pub fn physical(table: impl Into<String>) -> Self {
        Self::Physical {
            database: None,
            schema: None,
            table: table.into(),
            alias: None,
            column_aliases: Vec::new(),
        }
    }

    /// Builds a physical reference from name parts, mapping one, two or three
    /// parts onto table, schema.table or database.schema.table. Any other
    /// shape yields `None`.
    pub fn from_name_parts(mut parts: Vec<String>) -> Option<Self> {
        let table = match parts.len() {
            1..=3 => parts.pop()?,
            _ => return None,
        };
        let schema = parts.pop();
        let database = parts.pop();
        Some(Self::Physical {
            database,
            schema,
            table,
            alias: None,
            column_aliases: Vec::new(),
        })
    }

    pub fn with_alias(self, alias: Option<String>, columns: Vec<String>) -> Self {
        match self {
            Self::Physical {
                database,
                schema,
                table,
                ..
            } => Self::Physical {
                database,
                schema,
                table,
                alias,
                column_aliases: columns,
            },
            virtual_ref => virtual_ref,
        }
    }

    /// The name other clauses use to refer to this relation.
    pub fn visible_name(&self) -> &str {
        match self {
            Self::Physical { alias: Some(alias), .. } => alias,
            Self::Physical { table, .. } | Self::Virtual { table, .. } => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_parts_map_positionally() {
        let reference =
            TableReference::from_name_parts(vec!["db".into(), "sales".into(), "orders".into()]);
        assert_eq!(
            reference,
            Some(TableReference::Physical {
                database: Some("db".into()),
                schema: Some("sales".into()),
                table: "orders".into(),
                alias: None,
                column_aliases: vec![],
            })
        );

        let two = TableReference::from_name_parts(vec!["sales".into(), "orders".into()]).unwrap();
        assert!(matches!(
            two,
            TableReference::Physical { database: None, schema: Some(ref s), .. } if s == "sales"
        ));
    }

    #[test]
    fn test_name_parts_rejects_other_shapes() {
        assert!(TableReference::from_name_parts(vec![]).is_none());
        let four = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert!(TableReference::from_name_parts(four).is_none());
    }

    #[test]
    fn test_candidate_identity_ignores_comment() {
        let a = Candidate::new(CandidateKind::Column, "id").with_comment("primary key");
        let b = Candidate::new(CandidateKind::Column, "id");
        assert_eq!(a, b);
        assert!(Candidate::new(CandidateKind::Keyword, "z") < Candidate::new(CandidateKind::Table, "a"));
    }
}
