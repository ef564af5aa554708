//! Dispatch loop that routes registered queries to the KV or TX pipeline.

pub mod subscriber;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cosmos_rpc_client::rpc::SearchedTx;
use icq_types::{ModuleKeySpec, QueryType, RegisteredQuery, TransactionsFilter};
use storage::HeightStore;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::metrics::RequestMetrics;

pub use subscriber::ConfiguredQuerySource;

/// Proves and submits the keys of a KV query.
#[async_trait]
pub trait KvProcessor: Send + Sync {
    async fn process_and_submit(&self, query_id: u64, keys: &[ModuleKeySpec]) -> Result<(), RelayError>;
}

/// Searches the target chain for the transactions of a TX query.
#[async_trait]
pub trait TxQuerier: Send + Sync {
    async fn search_transactions(&self, filter: &TransactionsFilter) -> Result<Vec<SearchedTx>, RelayError>;
}

/// Proves and submits found transactions.
#[async_trait]
pub trait TxProcessor: Send + Sync {
    /// Returns the height the query is relayed up to, or `None` if `txs` moved nothing.
    async fn process_and_submit(&self, query_id: u64, txs: Vec<SearchedTx>) -> Result<Option<u64>, RelayError>;
}

/// Watches submitted transactions independently of the dispatch loop.
#[async_trait]
pub trait TxSubmitChecker: Send + Sync {
    async fn run(&self);
}

pub struct Relayer {
    tx_querier: Arc<dyn TxQuerier>,
    tx_processor: Arc<dyn TxProcessor>,
    kv_processor: Arc<dyn KvProcessor>,
    storage: Arc<dyn HeightStore>,
    tx_submit_checker: Option<Arc<dyn TxSubmitChecker>>,
    metrics: RequestMetrics,
}

impl Relayer {
    pub fn new(
        tx_querier: Arc<dyn TxQuerier>,
        tx_processor: Arc<dyn TxProcessor>,
        kv_processor: Arc<dyn KvProcessor>,
        storage: Arc<dyn HeightStore>,
        tx_submit_checker: Option<Arc<dyn TxSubmitChecker>>,
    ) -> Self {
        Self {
            tx_querier,
            tx_processor,
            kv_processor,
            storage,
            tx_submit_checker,
            metrics: RequestMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Processes queries one at a time, in the order they arrive, until `shutdown` flips to true
    /// or every sender of `tasks` is gone. The height store is closed before returning.
    pub async fn run(
        &self,
        mut tasks: mpsc::Receiver<RegisteredQuery>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), RelayError> {
        let checker_handle = self.tx_submit_checker.clone().map(|checker| {
            tokio::spawn(async move {
                checker.run().await;
            })
        });

        info!("Relayer started");
        loop {
            let query = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Shutdown requested");
                    break;
                }
                query = tasks.recv() => match query {
                    Some(query) => query,
                    None => {
                        info!("Task queue closed");
                        break;
                    }
                },
            };

            let start = Instant::now();
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    warn!(query_id = query.id, "Shutdown requested, aborting in-flight query");
                    break;
                }
                result = self.process(&query) => match result {
                    Ok(()) => self.metrics.add_success_request(query.query_type, start.elapsed()),
                    Err(e) => {
                        error!(query_id = query.id, query_type = %query.query_type, "Could not process message: {e}");
                        self.metrics.add_failed_request(query.query_type, start.elapsed());
                    }
                },
            }
        }

        if let Some(handle) = checker_handle {
            handle.abort();
        }
        self.stop()
    }

    fn stop(&self) -> Result<(), RelayError> {
        match self.storage.close() {
            Ok(()) => {
                info!("Relayer's storage has been closed");
                Ok(())
            }
            Err(e) => {
                error!("Failed to close relayer's storage: {e}");
                Err(e.into())
            }
        }
    }

    async fn process(&self, query: &RegisteredQuery) -> Result<(), RelayError> {
        match query.query_type {
            QueryType::Kv => {
                debug!(query_id = query.id, "Processing kv query");
                self.kv_processor.process_and_submit(query.id, &query.keys).await
            }
            QueryType::Tx => self.process_tx(query).await,
        }
    }

    async fn process_tx(&self, query: &RegisteredQuery) -> Result<(), RelayError> {
        debug!(query_id = query.id, "Processing tx query");
        let (filter, last_height) = self.build_tx_query(query)?;

        let txs = self.tx_querier.search_transactions(&filter).await?;
        let Some(height) = self.tx_processor.process_and_submit(query.id, txs).await? else {
            debug!(query_id = query.id, last_height, "No new transactions");
            return Ok(());
        };

        if height > last_height {
            self.storage.set_last_query_height(query.id, height)?;
            info!(query_id = query.id, height, "Saved last query height");
        }
        Ok(())
    }

    /// Returns the query's filter narrowed to transactions above its last relayed height.
    pub fn build_tx_query(&self, query: &RegisteredQuery) -> Result<(TransactionsFilter, u64), RelayError> {
        let last_height = self.get_last_query_height(query.id)?;
        let filter = TransactionsFilter::parse(&query.transactions_filter)?.with_height_floor(last_height);
        Ok((filter, last_height))
    }

    /// Returns the last relayed height of `query_id`, recording 0 for a query seen for the first time.
    pub fn get_last_query_height(&self, query_id: u64) -> Result<u64, RelayError> {
        match self.storage.get_last_query_height(query_id)? {
            Some(height) => Ok(height),
            None => {
                self.storage.set_last_query_height(query_id, 0)?;
                debug!(query_id, "Initialized last query height");
                Ok(0)
            }
        }
    }
}

/// Resolves once shutdown is signalled or the signalling side is gone.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
