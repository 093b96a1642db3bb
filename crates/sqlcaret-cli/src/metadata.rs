//! Catalog files for completion.
//!
//! A catalog file is the JSON form of one database's metadata, or an array
//! of them. Loading failures get their own error type so the binary can
//! report them with a distinct exit code.

use sqlcaret_core::StaticMetadata;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_catalog(path: &Path) -> Result<StaticMetadata, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = StaticMetadata::from_json(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), databases = catalog.len(), "loaded catalog");
    Ok(catalog)
}

/// The database to complete against: the requested one, or the catalog's
/// only database.
pub fn default_database(catalog: &StaticMetadata, requested: Option<&str>) -> String {
    if let Some(name) = requested {
        return name.to_string();
    }
    let mut names = catalog.databases().map(|db| db.name.as_str());
    match (names.next(), names.next()) {
        (Some(only), None) => only.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_catalog_and_pick_only_database() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"name":"shop","schemas":[{{"name":"public"}}]}}"#).unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(default_database(&catalog, None), "shop");
        assert_eq!(default_database(&catalog, Some("other")), "other");
    }

    #[test]
    fn test_invalid_catalog() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            load_catalog(file.path()),
            Err(CatalogError::Parse { .. })
        ));
    }
}
