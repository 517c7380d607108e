//! YAML document loading utilities
//!
//! Generic helpers for reading and writing the plain-text documents a
//! project is made of, shared by the deal store and the catalog.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing a YAML document
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

/// Read and deserialize one YAML document
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yml::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize and write one YAML document, replacing the file
pub fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), LoadError> {
    let yaml = serde_yml::to_string(value).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, yaml).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load all documents of type T from the given files
///
/// Files that fail to parse are skipped with a warning.
pub fn load_all<T: DeserializeOwned>(paths: impl IntoIterator<Item = PathBuf>) -> Vec<(PathBuf, T)> {
    let mut documents = Vec::new();

    for path in paths {
        match read_document::<T>(&path) {
            Ok(doc) => documents.push((path, doc)),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable document"),
        }
    }

    documents
}

/// Find a document by ID (supports prefix matching on the file stem)
///
/// Returns the single match; ambiguous prefixes return None.
pub fn find_document(paths: impl IntoIterator<Item = PathBuf>, id: &str) -> Option<PathBuf> {
    let mut matches = paths.into_iter().filter(|path| {
        path.file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| name.starts_with(id))
    });

    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_document_missing_file() {
        let result: Result<serde_json::Value, _> = read_document(Path::new("/nonexistent/a.yaml"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_read_document_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "key: [unclosed").unwrap();
        let result: Result<serde_json::Value, _> = read_document(&path);
        assert!(matches!(result, Err(LoadError::Parse { .. })));
    }

    #[test]
    fn test_load_all_skips_bad_files() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.yaml");
        let bad = dir.path().join("bad.yaml");
        fs::write(&good, "name: ok").unwrap();
        fs::write(&bad, "name: [").unwrap();

        let docs: Vec<(PathBuf, serde_json::Value)> = load_all(vec![good.clone(), bad]);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, good);
    }

    #[test]
    fn test_find_document_prefix() {
        let paths = vec![
            PathBuf::from("deals/DEAL-01AAA.pq.yaml"),
            PathBuf::from("deals/DEAL-01BBB.pq.yaml"),
        ];
        assert_eq!(
            find_document(paths.clone(), "DEAL-01A"),
            Some(PathBuf::from("deals/DEAL-01AAA.pq.yaml"))
        );
        // Ambiguous prefix
        assert_eq!(find_document(paths.clone(), "DEAL-01"), None);
        assert_eq!(find_document(paths, "DEAL-99"), None);
    }
}
