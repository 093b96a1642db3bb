use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schema used when a request does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// SQL dialect of the input.
///
/// Both dialects share the PostgreSQL-family grammar; the dialect picks the
/// tokenizer rules and the parser used for fallback splitting and fragment
/// resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Redshift,
}

impl Dialect {
    pub fn to_sqlparser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{PostgreSqlDialect, RedshiftSqlDialect};
        match self {
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Redshift => Box::new(RedshiftSqlDialect {}),
        }
    }

    pub fn all() -> &'static [Dialect] {
        &[Dialect::Postgres, Dialect::Redshift]
    }
}

/// Which statement kinds the completer should consider at the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    /// Any statement the grammar accepts, including several per script.
    #[default]
    All,
    /// A single query; completion starts from the select statement rule.
    Query,
}

/// A completion request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// Full SQL text, possibly holding several statements.
    pub sql: String,
    /// 1-based caret line.
    pub caret_line: usize,
    /// 0-based caret column on that line, counted in characters.
    pub caret_offset: usize,
    #[serde(default)]
    pub dialect: Dialect,
    /// Database handed to the metadata provider.
    #[serde(default)]
    pub default_database: String,
    /// Schema the user selected, if any. `None` means all schemas are searched
    /// and names outside `public` are offered with a schema prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub scene: Scene,
}

impl CompletionRequest {
    pub fn new(sql: impl Into<String>, caret_line: usize, caret_offset: usize) -> Self {
        Self {
            sql: sql.into(),
            caret_line,
            caret_offset,
            dialect: Dialect::default(),
            default_database: String::new(),
            default_schema: None,
            scene: Scene::default(),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = database.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }
}
