//! Catalog lookup used to turn relation and column rules into names.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::MetadataError;
use crate::types::DatabaseMetadata;

/// Resolves a database name to its catalog.
///
/// `Ok(None)` means the database is unknown. Completion then offers only
/// keywords, functions and names found in the statement itself.
pub trait MetadataProvider {
    fn database(&self, name: &str) -> Result<Option<DatabaseMetadata>, MetadataError>;
}

impl<F> MetadataProvider for F
where
    F: Fn(&str) -> Result<Option<DatabaseMetadata>, MetadataError>,
{
    fn database(&self, name: &str) -> Result<Option<DatabaseMetadata>, MetadataError> {
        self(name)
    }
}

/// A provider with no catalog at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataProvider for NoMetadata {
    fn database(&self, _name: &str) -> Result<Option<DatabaseMetadata>, MetadataError> {
        Ok(None)
    }
}

/// In-memory catalogs keyed by database name.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    databases: HashMap<String, DatabaseMetadata>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: DatabaseMetadata) -> Self {
        self.insert(database);
        self
    }

    pub fn insert(&mut self, database: DatabaseMetadata) {
        self.databases.insert(database.name.clone(), database);
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Loads catalogs from JSON: either one database object or an array of them.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Catalogs {
            Many(Vec<DatabaseMetadata>),
            One(DatabaseMetadata),
        }

        Ok(match serde_json::from_str(json)? {
            Catalogs::Many(databases) => databases.into_iter().collect(),
            Catalogs::One(database) => Self::new().with_database(database),
        })
    }

    pub fn databases(&self) -> impl Iterator<Item = &DatabaseMetadata> {
        self.databases.values()
    }
}

impl FromIterator<DatabaseMetadata> for StaticMetadata {
    fn from_iter<I: IntoIterator<Item = DatabaseMetadata>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for database in iter {
            metadata.insert(database);
        }
        metadata
    }
}

impl MetadataProvider for StaticMetadata {
    fn database(&self, name: &str) -> Result<Option<DatabaseMetadata>, MetadataError> {
        Ok(self.databases.get(name).cloned())
    }
}
