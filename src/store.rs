//! Document-store boundary.
//!
//! The pipeline treats its source as "stream all documents in a named
//! collection as schemaless key-value records". Anything beyond that —
//! schema validation, type coercion — is the ingestion stage's job.
//! [`JsonFileStore`] is the shipped backend: one JSON array file per
//! collection. The store handle is passed explicitly into ingestion; there is
//! no process-wide connection state.

use crate::error::{ExpenseInsightsError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// One raw record as fetched from the store, before any validation.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

pub trait DocumentStore {
    /// Streams every document in `collection` to exhaustion.
    ///
    /// A connection or read failure is fatal for the run; callers surface it
    /// as an error payload rather than retrying.
    fn fetch(&self, collection: &str) -> Result<Vec<RawDocument>>;
}

/// File-backed store: `<root>/<collection>.json` holds a JSON array of
/// objects. An object's `"id"` member becomes the document id; documents
/// without one get a positional id.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }
}

impl DocumentStore for JsonFileStore {
    fn fetch(&self, collection: &str) -> Result<Vec<RawDocument>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Err(ExpenseInsightsError::StoreUnavailable(format!(
                "collection file not found at {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(&path)?;
        let documents: Vec<Map<String, Value>> =
            serde_json::from_str(&raw).map_err(|e| {
                ExpenseInsightsError::StoreUnavailable(format!(
                    "could not decode collection file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(documents
            .into_iter()
            .enumerate()
            .map(|(index, fields)| RawDocument {
                id: document_id(&fields, index),
                fields,
            })
            .collect())
    }
}

fn document_id(fields: &Map<String, Value>, index: usize) -> String {
    match fields.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => format!("doc-{}", index),
    }
}

/// Writes `documents` as a collection file under `root`, creating the
/// directory if needed. Mostly useful for seeding demo and test stores.
pub fn write_collection(
    root: &Path,
    collection: &str,
    documents: &[Map<String, Value>],
) -> Result<()> {
    fs::create_dir_all(root)?;
    let path = root.join(format!("{}.json", collection));
    fs::write(&path, serde_json::to_string_pretty(documents)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_fetch_reads_collection_file() {
        let dir = tempfile::tempdir().unwrap();
        let documents = vec![
            doc(json!({"id": "t1", "amount": 12.5})),
            doc(json!({"amount": 3.0})),
        ];
        write_collection(dir.path(), "transactions", &documents).unwrap();

        let store = JsonFileStore::new(dir.path());
        let fetched = store.fetch("transactions").unwrap();

        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].id, "t1");
        assert_eq!(fetched[1].id, "doc-1");
    }

    #[test]
    fn test_missing_collection_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let err = store.fetch("transactions").unwrap_err();
        assert!(matches!(
            err,
            ExpenseInsightsError::StoreUnavailable(_)
        ));
        assert!(err.to_string().contains("transactions.json"));
    }

    #[test]
    fn test_unreadable_collection_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("transactions.json"), "not json").unwrap();

        let store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.fetch("transactions"),
            Err(ExpenseInsightsError::StoreUnavailable(_))
        ));
    }
}
