use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use icq_types::MerkleProof;
use tendermint::block::Height;
use tendermint_proto::crypto::ProofOp;
use tendermint_rpc::query::Query;
use tendermint_rpc::{Client, HttpClient, Order};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Response of an ABCI query. `height` is the height the node actually served.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbciQueryResponse {
    pub code: u32,
    pub log: String,
    pub value: Vec<u8>,
    pub proof_ops: Option<Vec<ProofOp>>,
    pub height: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastResponse {
    pub code: u32,
    pub log: String,
    pub hash: String,
}

/// Response of a broadcast that waited for block inclusion, with both check phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitResponse {
    pub check_tx_code: u32,
    pub check_tx_log: String,
    pub tx_result_code: u32,
    pub tx_result_log: String,
    pub hash: String,
    pub height: u64,
}

/// Execution result of a transaction, reduced to the fields committed in the block results hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxExecResult {
    pub code: u32,
    pub data: Vec<u8>,
    pub gas_wanted: i64,
    pub gas_used: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchedTx {
    pub hash: String,
    pub height: u64,
    pub index: u32,
    pub result: TxExecResult,
    pub tx: Vec<u8>,
    /// Inclusion proof against the block's data hash, present when the search asked for proofs.
    pub proof: Option<MerkleProof>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxSearchPage {
    pub txs: Vec<SearchedTx>,
    pub total_count: u32,
}

/// The node RPC surface the relayer depends on.
///
/// A height of `0` means the latest height the node has.
#[async_trait]
pub trait TendermintRpc: Send + Sync {
    async fn abci_query(&self, path: &str, data: Vec<u8>, height: u64, prove: bool) -> Result<AbciQueryResponse>;

    async fn tx_search(&self, query: Query, page: u32, per_page: u8) -> Result<TxSearchPage>;

    async fn block_results(&self, height: u64) -> Result<Vec<TxExecResult>>;

    async fn broadcast_tx_sync(&self, tx: Vec<u8>) -> Result<BroadcastResponse>;

    async fn broadcast_tx_async(&self, tx: Vec<u8>) -> Result<BroadcastResponse>;

    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> Result<CommitResponse>;
}

/// [`TendermintRpc`] over the CometBFT JSON-RPC HTTP interface.
pub struct HttpRpc {
    client: HttpClient,
    address: String,
    timeout: Duration,
}

impl HttpRpc {
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        debug!("Creating tendermint rpc client with endpoint: {address}");
        let client = HttpClient::new(address).map_err(|e| ClientError::Rpc(format!("{address}: {e}")))?;

        Ok(Self {
            client,
            address: address.to_string(),
            timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn call<T, F>(&self, method: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, tendermint_rpc::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ClientError::Rpc(format!("{method} on {}: {e}", self.address))),
            Err(_) => Err(ClientError::Rpc(format!(
                "{method} on {} timed out after {:?}",
                self.address, self.timeout
            ))),
        }
    }
}

fn to_height(height: u64) -> Result<Option<Height>> {
    if height == 0 {
        return Ok(None);
    }
    Height::try_from(height)
        .map(Some)
        .map_err(|e| ClientError::Decode(format!("invalid height {height}: {e}")))
}

fn exec_result(result: &tendermint::abci::types::ExecTxResult) -> TxExecResult {
    TxExecResult {
        code: result.code.value(),
        data: result.data.to_vec(),
        gas_wanted: result.gas_wanted,
        gas_used: result.gas_used,
    }
}

fn inclusion_proof(proof: &tendermint::tx::Proof) -> MerkleProof {
    MerkleProof {
        total: proof.proof.total as i64,
        index: proof.proof.index as i64,
        leaf_hash: proof.proof.leaf_hash.as_bytes().to_vec(),
        aunts: proof.proof.aunts.iter().map(|aunt| aunt.as_bytes().to_vec()).collect(),
    }
}

#[async_trait]
impl TendermintRpc for HttpRpc {
    async fn abci_query(&self, path: &str, data: Vec<u8>, height: u64, prove: bool) -> Result<AbciQueryResponse> {
        let height = to_height(height)?;
        let response = self
            .call(
                "abci_query",
                self.client.abci_query(Some(path.to_string()), data, height, prove),
            )
            .await?;

        let proof_ops = response.proof.map(|proof| {
            proof
                .ops
                .into_iter()
                .map(|op| ProofOp {
                    r#type: op.field_type,
                    key: op.key,
                    data: op.data,
                })
                .collect()
        });

        Ok(AbciQueryResponse {
            code: response.code.value(),
            log: response.log,
            value: response.value,
            proof_ops,
            height: response.height.value(),
        })
    }

    async fn tx_search(&self, query: Query, page: u32, per_page: u8) -> Result<TxSearchPage> {
        let response = self
            .call(
                "tx_search",
                self.client.tx_search(query, true, page, per_page, Order::Ascending),
            )
            .await?;

        let txs = response
            .txs
            .iter()
            .map(|tx| SearchedTx {
                hash: tx.hash.to_string(),
                height: tx.height.value(),
                index: tx.index,
                result: exec_result(&tx.tx_result),
                tx: tx.tx.clone(),
                proof: tx.proof.as_ref().map(inclusion_proof),
            })
            .collect();

        Ok(TxSearchPage {
            txs,
            total_count: response.total_count,
        })
    }

    async fn block_results(&self, height: u64) -> Result<Vec<TxExecResult>> {
        let height = to_height(height)?.ok_or_else(|| ClientError::Decode("block results need a height".to_string()))?;
        let response = self.call("block_results", self.client.block_results(height)).await?;

        Ok(response
            .txs_results
            .unwrap_or_default()
            .iter()
            .map(exec_result)
            .collect())
    }

    async fn broadcast_tx_sync(&self, tx: Vec<u8>) -> Result<BroadcastResponse> {
        let response = self.call("broadcast_tx_sync", self.client.broadcast_tx_sync(tx)).await?;
        Ok(BroadcastResponse {
            code: response.code.value(),
            log: response.log,
            hash: response.hash.to_string(),
        })
    }

    async fn broadcast_tx_async(&self, tx: Vec<u8>) -> Result<BroadcastResponse> {
        let response = self
            .call("broadcast_tx_async", self.client.broadcast_tx_async(tx))
            .await?;
        Ok(BroadcastResponse {
            code: response.code.value(),
            log: response.log,
            hash: response.hash.to_string(),
        })
    }

    async fn broadcast_tx_commit(&self, tx: Vec<u8>) -> Result<CommitResponse> {
        let response = self
            .call("broadcast_tx_commit", self.client.broadcast_tx_commit(tx))
            .await?;
        Ok(CommitResponse {
            check_tx_code: response.check_tx.code.value(),
            check_tx_log: response.check_tx.log,
            tx_result_code: response.tx_result.code.value(),
            tx_result_log: response.tx_result.log,
            hash: response.hash.to_string(),
            height: response.height.value(),
        })
    }
}
