//! Scripted [`TendermintRpc`] for exercising the reader and sender without a node.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use cosmrs::Any;
use cosmrs::proto::cosmos::auth::v1beta1::{BaseAccount, QueryAccountResponse};
use cosmrs::proto::cosmos::base::abci::v1beta1::GasInfo;
use cosmrs::proto::cosmos::tx::v1beta1::SimulateResponse;
use prost::Message;
use tendermint_proto::crypto::ProofOp;
use tendermint_rpc::query::Query;

use crate::account::ACCOUNT_QUERY_PATH;
use crate::error::{ClientError, Result};
use crate::reader::{Pair, Pairs};
use crate::rpc::{AbciQueryResponse, BroadcastResponse, CommitResponse, TendermintRpc, TxExecResult, TxSearchPage};
use crate::simulate::SIMULATE_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub path: String,
    pub data: Vec<u8>,
    pub height: u64,
    pub prove: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct MockRpc {
    latest_height: u64,
    by_key: HashMap<(String, Vec<u8>), AbciQueryResponse>,
    by_path: HashMap<String, AbciQueryResponse>,
    pages: Vec<TxSearchPage>,
    block_results: HashMap<u64, Vec<TxExecResult>>,
    sync_response: BroadcastResponse,
    async_response: BroadcastResponse,
    commit_response: CommitResponse,
    broadcast_error: Option<String>,
    queries: Mutex<Vec<RecordedQuery>>,
    searches: Mutex<Vec<(String, u32)>>,
    block_result_calls: Mutex<Vec<u64>>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            latest_height: 100,
            by_key: HashMap::new(),
            by_path: HashMap::new(),
            pages: Vec::new(),
            block_results: HashMap::new(),
            sync_response: BroadcastResponse {
                hash: "SYNC".to_string(),
                ..Default::default()
            },
            async_response: BroadcastResponse {
                hash: "ASYNC".to_string(),
                ..Default::default()
            },
            commit_response: CommitResponse {
                hash: "COMMIT".to_string(),
                ..Default::default()
            },
            broadcast_error: None,
            queries: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            block_result_calls: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    /// Height served for queries asking for the latest state.
    pub fn with_latest_height(mut self, height: u64) -> Self {
        self.latest_height = height;
        self
    }

    pub fn with_query_value(mut self, path: &str, value: Vec<u8>) -> Self {
        self.by_path.insert(
            path.to_string(),
            AbciQueryResponse {
                value,
                ..Default::default()
            },
        );
        self
    }

    pub fn with_query_failure(mut self, path: &str, code: u32, log: &str) -> Self {
        self.by_path.insert(
            path.to_string(),
            AbciQueryResponse {
                code,
                log: log.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_account(self, number: u64, sequence: u64) -> Self {
        let account = BaseAccount {
            address: "neutron1sender".to_string(),
            account_number: number,
            sequence,
            ..Default::default()
        };
        let response = QueryAccountResponse {
            account: Some(Any {
                type_url: "/cosmos.auth.v1beta1.BaseAccount".to_string(),
                value: account.encode_to_vec(),
            }),
        };
        self.with_query_value(ACCOUNT_QUERY_PATH, response.encode_to_vec())
    }

    pub fn with_simulated_gas(self, gas_info: Option<GasInfo>) -> Self {
        let response = SimulateResponse {
            gas_info,
            ..Default::default()
        };
        self.with_query_value(SIMULATE_PATH, response.encode_to_vec())
    }

    /// Registers a proven value for `key` in `store_key`.
    pub fn with_store_value(mut self, store_key: &str, key: &[u8], value: &[u8]) -> Self {
        self.by_key.insert(
            (format!("store/{store_key}/key"), key.to_vec()),
            AbciQueryResponse {
                value: value.to_vec(),
                proof_ops: Some(vec![ProofOp {
                    r#type: "ics23:iavl".to_string(),
                    key: key.to_vec(),
                    data: value.to_vec(),
                }]),
                ..Default::default()
            },
        );
        self
    }

    /// Registers the pairs a subspace query for `prefix` returns, proving each of them as well.
    pub fn with_subspace(mut self, store_key: &str, prefix: &[u8], pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        let encoded = Pairs {
            pairs: pairs
                .iter()
                .map(|(key, value)| Pair {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
        .encode_to_vec();

        self.by_key.insert(
            (format!("store/{store_key}/subspace"), prefix.to_vec()),
            AbciQueryResponse {
                value: encoded,
                ..Default::default()
            },
        );
        pairs
            .into_iter()
            .fold(self, |rpc, (key, value)| rpc.with_store_value(store_key, &key, &value))
    }

    pub fn with_search_pages(mut self, pages: Vec<TxSearchPage>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_block_results(mut self, height: u64, results: Vec<TxExecResult>) -> Self {
        self.block_results.insert(height, results);
        self
    }

    pub fn with_sync_response(mut self, code: u32, log: &str) -> Self {
        self.sync_response.code = code;
        self.sync_response.log = log.to_string();
        self
    }

    pub fn with_async_response(mut self, code: u32, log: &str) -> Self {
        self.async_response.code = code;
        self.async_response.log = log.to_string();
        self
    }

    pub fn with_commit_response(mut self, check_tx: (u32, &str), tx_result: (u32, &str)) -> Self {
        self.commit_response.check_tx_code = check_tx.0;
        self.commit_response.check_tx_log = check_tx.1.to_string();
        self.commit_response.tx_result_code = tx_result.0;
        self.commit_response.tx_result_log = tx_result.1.to_string();
        self
    }

    /// Makes every broadcast fail at the transport level.
    pub fn with_broadcast_error(mut self, reason: &str) -> Self {
        self.broadcast_error = Some(reason.to_string());
        self
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        lock(&self.queries).clone()
    }

    /// Query string and page of every search issued.
    pub fn searches(&self) -> Vec<(String, u32)> {
        lock(&self.searches).clone()
    }

    pub fn block_result_calls(&self) -> Vec<u64> {
        lock(&self.block_result_calls).clone()
    }

    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        lock(&self.broadcasts).clone()
    }

    fn record_broadcast(&self, tx: Vec<u8>) -> Result<()> {
        if let Some(reason) = &self.broadcast_error {
            return Err(ClientError::Rpc(reason.clone()));
        }
        lock(&self.broadcasts).push(tx);
        Ok(())
    }
}

#[async_trait]
impl TendermintRpc for MockRpc {
    async fn abci_query(&self, path: &str, data: Vec<u8>, height: u64, prove: bool) -> Result<AbciQueryResponse> {
        lock(&self.queries).push(RecordedQuery {
            path: path.to_string(),
            data: data.clone(),
            height,
            prove,
        });

        let mut response = self
            .by_key
            .get(&(path.to_string(), data))
            .or_else(|| self.by_path.get(path))
            .cloned()
            .ok_or_else(|| ClientError::Rpc(format!("no response scripted for {path}")))?;

        if !prove {
            response.proof_ops = None;
        }
        if response.height == 0 {
            response.height = if height == 0 { self.latest_height } else { height };
        }
        Ok(response)
    }

    async fn tx_search(&self, query: Query, page: u32, _per_page: u8) -> Result<TxSearchPage> {
        lock(&self.searches).push((query.to_string(), page));

        let index = page.checked_sub(1).ok_or_else(|| ClientError::Rpc("page must be positive".to_string()))?;
        Ok(self.pages.get(index as usize).cloned().unwrap_or_else(|| TxSearchPage {
            txs: Vec::new(),
            total_count: self.pages.first().map(|p| p.total_count).unwrap_or_default(),
        }))
    }

    async fn block_results(&self, height: u64) -> Result<Vec<TxExecResult>> {
        lock(&self.block_result_calls).push(height);
        self.block_results
            .get(&height)
            .cloned()
            .ok_or_else(|| ClientError::Rpc(format!("no block results for height {height}")))
    }

    async fn broadcast_tx_sync(&self, tx: Vec<u8>) -> Result<BroadcastResponse> {
        self.record_broadcast(tx)?;
        Ok(self.sync_response.clone())
    }

    async fn broadcast_tx_async(&self, tx: Vec<u8>) -> Result<BroadcastResponse> {
        self.record_broadcast(tx)?;
        Ok(self.async_response.clone())
    }

    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> Result<CommitResponse> {
        self.record_broadcast(tx)?;
        Ok(self.commit_response.clone())
    }
}
