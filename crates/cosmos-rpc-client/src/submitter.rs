use async_trait::async_trait;
use cosmrs::Any;
use icq_types::{MsgSubmitQueryResult, QueryResult, StorageValue, TxValue};
use prost::Message;
use tracing::info;

use crate::error::Result;

/// Signs and broadcasts a set of messages on behalf of one sender.
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    /// Returns the hash of the broadcast transaction.
    async fn send(&self, sender: &str, messages: Vec<Any>) -> Result<String>;

    fn sender_address(&self) -> &str;
}

/// Trait for query result submission operations
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit the kv proofs of a query proven at `height`.
    async fn submit_proof(&self, height: u64, query_id: u64, proofs: Vec<StorageValue>) -> Result<()>;

    /// Submit proven transactions matching a tx query.
    async fn submit_tx_proof(&self, query_id: u64, proofs: Vec<TxValue>) -> Result<()>;
}

/// Wraps query results in a single `MsgSubmitQueryResult` and broadcasts it.
pub struct ProofSubmitter<B> {
    broadcaster: B,
}

impl<B: TxBroadcaster> ProofSubmitter<B> {
    pub fn new(broadcaster: B) -> Self {
        Self { broadcaster }
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    /// Builds the submission message and runs its self validation.
    pub fn build_message(&self, query_id: u64, result: QueryResult) -> Result<Any> {
        let msg = MsgSubmitQueryResult::new(query_id, self.broadcaster.sender_address().to_string(), result);
        msg.validate_basic()?;

        Ok(Any {
            type_url: MsgSubmitQueryResult::TYPE_URL.to_string(),
            value: msg.encode_to_vec(),
        })
    }

    async fn submit(&self, query_id: u64, result: QueryResult) -> Result<()> {
        let message = self.build_message(query_id, result)?;
        let sender = self.broadcaster.sender_address();

        let tx_hash = self.broadcaster.send(sender, vec![message]).await?;
        info!(query_id, tx_hash = %tx_hash, "submitted query result");
        Ok(())
    }
}

#[async_trait]
impl<B: TxBroadcaster> Submitter for ProofSubmitter<B> {
    async fn submit_proof(&self, height: u64, query_id: u64, proofs: Vec<StorageValue>) -> Result<()> {
        info!(query_id, height, count = proofs.len(), "Submitting kv proofs");
        self.submit(
            query_id,
            QueryResult::Kv {
                height,
                kv_results: proofs,
            },
        )
        .await
    }

    async fn submit_tx_proof(&self, query_id: u64, proofs: Vec<TxValue>) -> Result<()> {
        info!(query_id, count = proofs.len(), "Submitting tx proofs");
        self.submit(query_id, QueryResult::Tx { txs: proofs }).await
    }
}
