//! In-memory [`HeightStore`] for tests of the code that drives the cursor.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{HeightStore, StorageError};

#[derive(Default)]
pub struct MemoryHeightStore {
    heights: Mutex<HashMap<u64, u64>>,
    writes: AtomicUsize,
    closed: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryHeightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_height(self, query_id: u64, height: u64) -> Self {
        self.heights.lock().unwrap_or_else(|e| e.into_inner()).insert(query_id, height);
        self
    }

    /// Number of successful `set_last_query_height` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Makes every following write fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

impl HeightStore for MemoryHeightStore {
    fn get_last_query_height(&self, query_id: u64) -> Result<Option<u64>, StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        let heights = self.heights.lock().unwrap_or_else(|e| e.into_inner());
        Ok(heights.get(&query_id).copied())
    }

    fn set_last_query_height(&self, query_id: u64, height: u64) -> Result<(), StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::MissingColumnFamily("last_query_heights"));
        }
        self.heights
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(query_id, height);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}
