//! RocksDB backed [`HeightStore`]. Heights live in the `last_query_heights` column family,
//! keyed by the big-endian query id with the big-endian height as value.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, FlushOptions, Options};
use tracing::debug;

use crate::{HeightStore, StorageError};

const CF_LAST_QUERY_HEIGHTS: &str = "last_query_heights";

pub struct RocksDbHeightStore {
    db: Arc<DB>,
    closed: AtomicBool,
}

impl RocksDbHeightStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![ColumnFamilyDescriptor::new(CF_LAST_QUERY_HEIGHTS, Options::default())];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self {
            db: Arc::new(db),
            closed: AtomicBool::new(false),
        })
    }

    fn get_cf(&self) -> Result<&ColumnFamily, StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        self.db
            .cf_handle(CF_LAST_QUERY_HEIGHTS)
            .ok_or(StorageError::MissingColumnFamily(CF_LAST_QUERY_HEIGHTS))
    }

    fn query_key(&self, query_id: u64) -> [u8; 8] {
        query_id.to_be_bytes()
    }
}

impl HeightStore for RocksDbHeightStore {
    fn get_last_query_height(&self, query_id: u64) -> Result<Option<u64>, StorageError> {
        let cf = self.get_cf()?;

        match self.db.get_cf(cf, self.query_key(query_id))? {
            Some(data) => {
                let bytes: [u8; 8] = data.as_slice().try_into().map_err(|_| StorageError::Corrupted {
                    query_id,
                    len: data.len(),
                })?;
                Ok(Some(u64::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    fn set_last_query_height(&self, query_id: u64, height: u64) -> Result<(), StorageError> {
        let cf = self.get_cf()?;
        self.db.put_cf(cf, self.query_key(query_id), height.to_be_bytes())?;
        debug!(query_id, height, "stored last query height");
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        let cf = self.get_cf()?;
        let mut opts = FlushOptions::default();
        opts.set_wait(true);
        self.db.flush_cf_opt(cf, &opts)?;
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_absent_height_is_none() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbHeightStore::new(dir.path()).unwrap();

        assert_eq!(store.get_last_query_height(1).unwrap(), None);
    }

    #[test]
    fn test_heights_are_kept_per_query() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbHeightStore::new(dir.path()).unwrap();

        store.set_last_query_height(1, 0).unwrap();
        store.set_last_query_height(2, 120).unwrap();
        store.set_last_query_height(2, 135).unwrap();

        assert_eq!(store.get_last_query_height(1).unwrap(), Some(0));
        assert_eq!(store.get_last_query_height(2).unwrap(), Some(135));
        assert_eq!(store.get_last_query_height(3).unwrap(), None);
    }

    #[test]
    fn test_heights_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksDbHeightStore::new(dir.path()).unwrap();
            store.set_last_query_height(7, 4242).unwrap();
            store.close().unwrap();
        }

        let store = RocksDbHeightStore::new(dir.path()).unwrap();
        assert_eq!(store.get_last_query_height(7).unwrap(), Some(4242));
    }

    #[test]
    fn test_closed_store_rejects_access() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbHeightStore::new(dir.path()).unwrap();
        store.close().unwrap();

        assert!(matches!(store.get_last_query_height(1), Err(StorageError::Closed)));
        assert!(matches!(store.set_last_query_height(1, 5), Err(StorageError::Closed)));
        assert!(matches!(store.close(), Err(StorageError::Closed)));
    }
}
