use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Catalog of one database, as handed to the completer by a metadata provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetadata {
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<SchemaMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMetadata {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableMetadata>,
    #[serde(default)]
    pub views: Vec<String>,
    #[serde(default)]
    pub materialized_views: Vec<String>,
    #[serde(default)]
    pub foreign_tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

fn default_nullable() -> bool {
    true
}

impl DatabaseMetadata {
    pub fn schema(&self, name: &str) -> Option<&SchemaMetadata> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|schema| schema.name.as_str())
    }
}

impl SchemaMetadata {
    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.iter().find(|table| table.name == name)
    }
}
