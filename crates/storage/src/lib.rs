use thiserror::Error;

pub mod heights;
#[cfg(any(test, feature = "test"))]
pub mod memory;

pub use heights::RocksDbHeightStore;
#[cfg(any(test, feature = "test"))]
pub use memory::MemoryHeightStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rocksdb::Error),
    #[error("Column family {0} not found")]
    MissingColumnFamily(&'static str),
    #[error("Stored height for query {query_id} is corrupted: expected 8 bytes, found {len}")]
    Corrupted { query_id: u64, len: usize },
    #[error("Height store is closed")]
    Closed,
}

/// HeightStore keeps, for every TX query, the highest remote height the relayer has already submitted.
///
/// Implementations must be safe to share across tasks. Writes are durable once they return.
pub trait HeightStore: Send + Sync {
    /// Returns `Ok(None)` if nothing was ever recorded for `query_id`.
    fn get_last_query_height(&self, query_id: u64) -> Result<Option<u64>, StorageError>;

    fn set_last_query_height(&self, query_id: u64, height: u64) -> Result<(), StorageError>;

    /// Flushes pending writes. Every call after a successful close fails with [`StorageError::Closed`].
    fn close(&self) -> Result<(), StorageError>;
}
