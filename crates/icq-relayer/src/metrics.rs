use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use icq_types::QueryType;

#[derive(Debug, Default)]
struct Counters {
    successes: AtomicU64,
    failures: AtomicU64,
    elapsed_micros: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub successes: u64,
    pub failures: u64,
    pub elapsed: Duration,
}

/// Success and failure counters with total processing time, per query type.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    kv: Counters,
    tx: Counters,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, query_type: QueryType) -> &Counters {
        match query_type {
            QueryType::Kv => &self.kv,
            QueryType::Tx => &self.tx,
        }
    }

    pub fn add_success_request(&self, query_type: QueryType, elapsed: Duration) {
        let counters = self.counters(query_type);
        counters.successes.fetch_add(1, Ordering::Relaxed);
        counters
            .elapsed_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn add_failed_request(&self, query_type: QueryType, elapsed: Duration) {
        let counters = self.counters(query_type);
        counters.failures.fetch_add(1, Ordering::Relaxed);
        counters
            .elapsed_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn stats(&self, query_type: QueryType) -> RequestStats {
        let counters = self.counters(query_type);
        RequestStats {
            successes: counters.successes.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            elapsed: Duration::from_micros(counters.elapsed_micros.load(Ordering::Relaxed)),
        }
    }
}
