//! Redb (Rust embedded database) backend for MediaTwin storage.
//!
//! Redb is a pure Rust embedded key-value store with ACID transactions.
//! Each logical [`Table`] maps to one redb table; every write commits its own
//! transaction, so data is durable when a call returns.
//!
//! # Configuration Example
//! ```yaml
//! store:
//!   backend:
//!     kind: redb
//!     path: "/data/mediatwin.redb"
//! ```

use crate::backend::Table;
use crate::{IndexBackend, IndexError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const MEDIA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("media");
const TREES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("trees");

fn definition(table: Table) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match table {
        Table::Media => MEDIA_TABLE,
        Table::Trees => TREES_TABLE,
    }
}

/// Redb backend for persistent key-value storage.
///
/// `Arc<Database>` lets the backend be shared across threads; redb handles
/// its own locking and MVCC.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a Redb database at the given path, creating both tables.
    ///
    /// # Example
    /// ```no_run
    /// use index::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/mediatwin.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(IndexError::backend)?;

        let write_txn = db.begin_write().map_err(IndexError::backend)?;
        for table in Table::ALL {
            // Opening a table inside a write transaction creates it.
            write_txn
                .open_table(definition(table))
                .map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, table: Table, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut handle = write_txn
                .open_table(definition(table))
                .map_err(IndexError::backend)?;
            handle.insert(key, value).map_err(IndexError::backend)?;
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn get(&self, table: Table, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let handle = read_txn
            .open_table(definition(table))
            .map_err(IndexError::backend)?;

        let value = handle.get(key).map_err(IndexError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn delete(&self, table: Table, key: &str) -> Result<bool, IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        let existed = {
            let mut handle = write_txn
                .open_table(definition(table))
                .map_err(IndexError::backend)?;
            let removed = handle.remove(key).map_err(IndexError::backend)?;
            removed.is_some()
        };
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(existed)
    }

    fn batch_put(&self, table: Table, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let write_txn = self.db.begin_write().map_err(IndexError::backend)?;
        {
            let mut handle = write_txn
                .open_table(definition(table))
                .map_err(IndexError::backend)?;
            for (key, value) in entries {
                handle
                    .insert(key.as_str(), value.as_slice())
                    .map_err(IndexError::backend)?;
            }
        }
        write_txn.commit().map_err(IndexError::backend)?;
        Ok(())
    }

    fn scan(
        &self,
        table: Table,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(IndexError::backend)?;
        let handle = read_txn
            .open_table(definition(table))
            .map_err(IndexError::backend)?;

        for item in handle.iter().map_err(IndexError::backend)? {
            let (key, value) = item.map_err(IndexError::backend)?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }
}
