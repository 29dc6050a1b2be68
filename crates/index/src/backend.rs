use crate::IndexError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Logical tables every backend provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Encoded media records keyed by id.
    Media,
    /// Encoded tree snapshots keyed by algorithm name.
    Trees,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::Media, Table::Trees];

    pub const fn name(self) -> &'static str {
        match self {
            Table::Media => "media",
            Table::Trees => "trees",
        }
    }
}

/// Trait for a key-value storage backend.
/// This allows for different storage implementations (e.g., in-memory, Redb).
pub trait IndexBackend: Send + Sync {
    /// Insert or update a key-value pair.
    fn put(&self, table: Table, key: &str, value: &[u8]) -> Result<(), IndexError>;
    /// Retrieve a value by key.
    fn get(&self, table: Table, key: &str) -> Result<Option<Vec<u8>>, IndexError>;
    /// Delete a key, returning whether it existed.
    fn delete(&self, table: Table, key: &str) -> Result<bool, IndexError>;
    /// Insert or update multiple key-value pairs in one write.
    fn batch_put(&self, table: Table, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError>;
    /// Visit every entry of a table in key order.
    fn scan(
        &self,
        table: Table,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;
    /// Number of entries in a table.
    fn len(&self, table: Table) -> Result<usize, IndexError> {
        let mut count = 0usize;
        self.scan(table, &mut |_, _| {
            count += 1;
            Ok(())
        })?;
        Ok(count)
    }
    /// Flush any buffered writes to the backend.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Configuration for selecting and building a backend.
///
/// # Example
/// ```
/// use index::BackendConfig;
///
/// // In-memory (for testing)
/// let config = BackendConfig::in_memory();
///
/// // Redb (pure Rust, persistent)
/// let config = BackendConfig::redb("/data/mediatwin.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Use Redb for storage. The `path` is the file path for the database.
    ///
    /// Requires the `backend-redb` feature (enabled by default).
    Redb { path: String },
    /// Use an in-memory map. Nothing survives the process.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Build the backend this configuration names.
    ///
    /// Fails when the selected backend was compiled out.
    pub fn build(&self) -> Result<Box<dyn IndexBackend>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(IndexError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

type TableMap = BTreeMap<String, Vec<u8>>;

/// An in-memory backend: one ordered map per table behind a `RwLock`.
pub struct InMemoryBackend {
    tables: RwLock<hashbrown::HashMap<Table, TableMap>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let tables = Table::ALL.iter().map(|&t| (t, TableMap::new())).collect();
        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBackend for InMemoryBackend {
    fn put(&self, table: Table, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.tables
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .entry(table)
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, table: Table, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.get(&table).and_then(|t| t.get(key)).cloned())
    }

    fn delete(&self, table: Table, key: &str) -> Result<bool, IndexError> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard
            .get_mut(&table)
            .map(|t| t.remove(key).is_some())
            .unwrap_or(false))
    }

    fn batch_put(&self, table: Table, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        // A single write lock is held for the entire batch insert.
        let mut guard = self
            .tables
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let target = guard.entry(table).or_default();
        for (key, value) in entries {
            target.insert(key, value);
        }
        Ok(())
    }

    fn scan(
        &self,
        table: Table,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        if let Some(entries) = guard.get(&table) {
            for (key, value) in entries {
                visitor(key, value)?;
            }
        }
        Ok(())
    }

    fn len(&self, table: Table) -> Result<usize, IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.get(&table).map(|t| t.len()).unwrap_or(0))
    }
}

/// The Redb backend implementation.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use redb::RedbBackend;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_isolated() {
        let backend = InMemoryBackend::new();
        backend.put(Table::Media, "k", b"media").unwrap();
        backend.put(Table::Trees, "k", b"tree").unwrap();
        assert_eq!(backend.get(Table::Media, "k").unwrap(), Some(b"media".to_vec()));
        assert_eq!(backend.get(Table::Trees, "k").unwrap(), Some(b"tree".to_vec()));
        assert!(backend.delete(Table::Media, "k").unwrap());
        assert!(!backend.delete(Table::Media, "k").unwrap());
        assert_eq!(backend.len(Table::Trees).unwrap(), 1);
    }

    #[test]
    fn scan_visits_in_key_order() {
        let backend = InMemoryBackend::new();
        backend
            .batch_put(
                Table::Media,
                vec![
                    ("b".to_string(), vec![2]),
                    ("a".to_string(), vec![1]),
                    ("c".to_string(), vec![3]),
                ],
            )
            .unwrap();
        let mut keys = Vec::new();
        backend
            .scan(Table::Media, &mut |key, _| {
                keys.push(key.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn backend_config_serde() {
        let cfg: BackendConfig = serde_json::from_str(r#"{"kind":"redb","path":"x.redb"}"#).unwrap();
        assert_eq!(cfg, BackendConfig::redb("x.redb"));
        let cfg: BackendConfig = serde_json::from_str(r#"{"kind":"in_memory"}"#).unwrap();
        assert_eq!(cfg, BackendConfig::InMemory);
    }
}
