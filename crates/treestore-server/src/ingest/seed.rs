//! Seed loader: local JSON snapshot of the catalog.
//!
//! The seed file is a JSON array of Tree objects that mirrors an earlier
//! dataset snapshot. Each element goes through the same field validation as
//! a create payload. A record carrying an id is inserted verbatim under it.
//! A record without one is handed a fresh user id.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use treestore_core::{tree_from_json, Tree, TreeStore};

use crate::error::{ServiceError, ServiceResult};

/// Read every well-formed record of a seed file.
///
/// Fails if the file cannot be read or is not a JSON array. Elements that
/// fail validation are skipped with a warning. Records without an id come
/// back with id 0.
pub fn read_seed(path: &Path) -> ServiceResult<Vec<Tree>> {
    let text = fs::read_to_string(path).map_err(|e| ServiceError::Seed {
        path: path.to_path_buf(),
        reason: format!("failed to read: {}", e),
    })?;

    let items: Vec<Value> = serde_json::from_str(&text).map_err(|e| ServiceError::Seed {
        path: path.to_path_buf(),
        reason: format!("expected a JSON array of trees: {}", e),
    })?;

    let mut trees = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match tree_from_json(&item) {
            Ok(tree) => trees.push(tree),
            Err(e) => warn!(path = %path.display(), index, error = %e, "skipping malformed seed record"),
        }
    }
    Ok(trees)
}

/// Load a seed file into the store. Returns how many distinct ids it wrote.
///
/// Never fails: an unusable file is logged and contributes nothing.
pub fn load_seed(store: &TreeStore, path: &Path) -> usize {
    let trees = match read_seed(path) {
        Ok(trees) => trees,
        Err(e) => {
            warn!(error = %e, "seed ingestion skipped");
            return 0;
        }
    };

    let mut written: Vec<u64> = Vec::with_capacity(trees.len());
    for tree in trees {
        if tree.id == 0 {
            written.push(store.insert_assigning_id(tree));
        } else {
            let id = tree.id;
            written.push(id);
            if store.insert_with_id(tree).is_some() {
                debug!(id, "seed record replaced an earlier one");
            }
        }
    }
    written.sort_unstable();
    written.dedup();

    let count = written.len();
    info!(path = %path.display(), count, "loaded seed trees");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use treestore_core::Origin;
    use tempfile::NamedTempFile;

    fn seed_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_seed() {
        let file = seed_file(r#"[
            {"id": 70, "name": "Marronnier", "height": 22},
            {"id": 1800, "name": "Pin", "type": "Pinus"}
        ]"#);
        let trees = read_seed(file.path()).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].id, 70);
        assert_eq!(trees[1].genus.as_deref(), Some("Pinus"));
    }

    #[test]
    fn test_malformed_record_skipped() {
        let file = seed_file(r#"[
            {"id": 10, "name": "Cèdre"},
            {"id": "ten", "name": 3},
            {"id": 20, "name": "If"}
        ]"#);
        let ids: Vec<u64> = read_seed(file.path()).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![10, 20]);
    }

    #[test]
    fn test_not_an_array() {
        let file = seed_file(r#"{"id": 10, "name": "Cèdre"}"#);
        assert!(matches!(read_seed(file.path()), Err(ServiceError::Seed { .. })));
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        let store = TreeStore::new();
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_seed(&store, &dir.path().join("absent.json")), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let file = seed_file(r#"[{"id": 70, "name": "Marronnier", "height": "22", "plantationYear": "1862"}]"#);
        let trees = read_seed(file.path()).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].height, Some(22.0));
        assert_eq!(trees[0].plantation_year, Some(1862));
    }

    #[test]
    fn test_invalid_field_skipped() {
        let file = seed_file(r#"[
            {"id": 10, "name": "Cèdre", "height": 400},
            {"id": 20, "name": ""},
            {"id": 30, "name": "If"}
        ]"#);
        let ids: Vec<u64> = read_seed(file.path()).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![30]);
    }

    #[test]
    fn test_records_without_id_get_user_ids() {
        let file = seed_file(r#"[{"name": "A"}, {"name": "B"}, {"name": "C"}]"#);
        let store = TreeStore::new();
        assert_eq!(load_seed(&store, file.path()), 3);
        assert_eq!(store.len(), 3);
        assert!(!store.contains(0));
        assert_eq!(store.count(Origin::Dataset), 0);
        let ids: Vec<u64> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_ids_counted_once() {
        let file = seed_file(r#"[{"id": 70, "name": "Marronnier"}, {"id": 70, "name": "Marronnier bis"}]"#);
        let store = TreeStore::new();
        assert_eq!(load_seed(&store, file.path()), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(70).unwrap().name, "Marronnier bis");
    }

    #[test]
    fn test_load_seed_verbatim_ids() {
        let file = seed_file(r#"[{"id": 70, "name": "Marronnier"}, {"id": 3, "name": "Noyer"}]"#);
        let store = TreeStore::new();
        assert_eq!(load_seed(&store, file.path()), 2);
        assert!(store.contains(70));
        assert!(store.contains(3));
    }
}
