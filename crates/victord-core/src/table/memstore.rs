//! In-memory [`KeyValueStore`] implementation.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use ciborium::value::Value;

use crate::{error::TableError, table::KeyValueStore};

/// Binary-safe key-value store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemTable {
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl MemTable {
    /// Allocate an empty table.
    #[must_use]
    pub fn alloc() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Load a checkpoint previously written by [`KeyValueStore::dump`].
    ///
    /// # Errors
    ///
    /// [`TableError::System`] if the file cannot be opened or does not
    /// contain a valid snapshot.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|err| TableError::System(err.to_string()))?;
        let value: Value =
            ciborium::de::from_reader(BufReader::new(file)).map_err(|err| TableError::System(err.to_string()))?;
        let Value::Array(pairs) = value else {
            return Err(TableError::System("snapshot is not an array".to_string()));
        };

        let mut entries = HashMap::with_capacity(pairs.len());
        for pair in pairs {
            let Value::Array(kv) = pair else {
                return Err(TableError::System("malformed snapshot entry".to_string()));
            };
            let [key, value] = <[Value; 2]>::try_from(kv)
                .map_err(|_| TableError::System("snapshot entry is not a pair".to_string()))?;
            let (Value::Bytes(key), Value::Bytes(value)) = (key, value) else {
                return Err(TableError::System("snapshot entry is not a byte pair".to_string()));
            };
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }
}

impl KeyValueStore for MemTable {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, TableError> {
        self.entries.get(key).cloned().ok_or(TableError::KeyNotFound)
    }

    fn del(&mut self, key: &[u8]) -> Result<(), TableError> {
        self.entries.remove(key).map(|_| ()).ok_or(TableError::KeyNotFound)
    }

    fn size(&self) -> u64 {
        self.entries.len() as u64
    }

    fn dump(&self, path: &Path) -> Result<(), TableError> {
        let pairs: Vec<Value> = self
            .entries
            .iter()
            .map(|(key, value)| Value::Array(vec![Value::Bytes(key.clone()), Value::Bytes(value.clone())]))
            .collect();
        let file = File::create(path).map_err(|err| TableError::System(err.to_string()))?;
        ciborium::ser::into_writer(&Value::Array(pairs), BufWriter::new(file))
            .map_err(|err| TableError::System(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let mut table = MemTable::alloc();
        table.put(b"k", b"v");
        assert_eq!(table.get(b"k").unwrap(), b"v");
    }

    #[test]
    fn put_overwrites_existing_key() {
        let mut table = MemTable::alloc();
        table.put(b"k", b"v1");
        table.put(b"k", b"v2");
        assert_eq!(table.get(b"k").unwrap(), b"v2");
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let table = MemTable::alloc();
        assert_eq!(table.get(b"absent"), Err(TableError::KeyNotFound));
    }

    #[test]
    fn del_missing_key_is_not_found() {
        let mut table = MemTable::alloc();
        assert_eq!(table.del(b"absent"), Err(TableError::KeyNotFound));
    }

    #[test]
    fn dump_then_load_round_trips_binary_keys_and_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.table");

        let mut table = MemTable::alloc();
        table.put(&[0u8, 1, 2, 255], &[9u8, 8, 7]);
        table.dump(&path).unwrap();

        let reloaded = MemTable::load(&path).unwrap();
        assert_eq!(reloaded.get(&[0u8, 1, 2, 255]).unwrap(), vec![9u8, 8, 7]);
    }
}
