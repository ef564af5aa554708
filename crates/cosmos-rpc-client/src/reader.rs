use std::collections::HashMap;
use std::sync::Arc;

use icq_types::{FilterOp, FilterValue, StorageValue, TransactionsFilter, TxValue};
use tendermint_rpc::query::{Operand, Query};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::merkle;
use crate::rpc::{AbciQueryResponse, SearchedTx, TendermintRpc, TxExecResult};

/// Key/value pairs returned by a `subspace` store query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pairs {
    #[prost(message, repeated, tag = "1")]
    pub pairs: Vec<Pair>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pair {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// Read-only access to the proven state and transactions of a target chain.
pub struct ChainReader<R: ?Sized> {
    rpc: Arc<R>,
}

impl<R: ?Sized> Clone for ChainReader<R> {
    fn clone(&self) -> Self {
        Self { rpc: self.rpc.clone() }
    }
}

impl<R: TendermintRpc + ?Sized> ChainReader<R> {
    pub fn new(rpc: Arc<R>) -> Self {
        Self { rpc }
    }

    async fn store_query(
        &self,
        store_key: &str,
        endpoint: &str,
        data: Vec<u8>,
        height: u64,
        prove: bool,
    ) -> Result<AbciQueryResponse> {
        let path = format!("store/{store_key}/{endpoint}");
        let response = self.rpc.abci_query(&path, data, height, prove).await?;

        if response.code != 0 {
            return Err(ClientError::RemoteQuery {
                path,
                code: response.code,
                log: response.log,
            });
        }
        Ok(response)
    }

    /// Fetches `key` from `store_key` with its proof. A `height` of 0 reads the latest state.
    ///
    /// Returns the proven value and the height the node actually served.
    pub async fn query_tendermint_proof(
        &self,
        height: u64,
        store_key: &str,
        key: Vec<u8>,
    ) -> Result<(StorageValue, u64)> {
        let response = self.store_query(store_key, "key", key.clone(), height, true).await?;

        let proof_ops = response
            .proof_ops
            .ok_or_else(|| ClientError::Decode(format!("no proof returned for key {} in {store_key}", hex::encode(&key))))?;

        let value = StorageValue {
            storage_prefix: store_key.to_string(),
            key,
            value: response.value,
            proof_ops,
        };
        Ok((value, response.height))
    }

    /// Fetches every key under `prefix` in `store_key`, each proven at the same height.
    ///
    /// An empty subspace is not an error and yields no values.
    pub async fn query_iterate_tendermint_proof(
        &self,
        height: u64,
        store_key: &str,
        prefix: Vec<u8>,
    ) -> Result<(Vec<StorageValue>, u64)> {
        let response = self.store_query(store_key, "subspace", prefix, height, false).await?;
        let served_height = response.height;

        let pairs: Pairs = prost::Message::decode(response.value.as_slice())?;
        let mut values = Vec::with_capacity(pairs.pairs.len());
        for pair in pairs.pairs {
            let (value, _) = self.query_tendermint_proof(served_height, store_key, pair.key).await?;
            values.push(value);
        }

        debug!(store_key, height = served_height, count = values.len(), "proved subspace");
        Ok((values, served_height))
    }

    /// Searches all transactions matching `filter`, following pagination until every match is collected.
    pub async fn search_transactions(&self, filter: &TransactionsFilter, page_size: u8) -> Result<Vec<SearchedTx>> {
        let query = build_query(filter)?;
        let page_size = page_size.max(1);

        let mut txs = Vec::new();
        let mut page = 1;
        loop {
            let response = self.rpc.tx_search(query.clone(), page, page_size).await?;
            let received = response.txs.len();
            txs.extend(response.txs);

            if received == 0 || txs.len() >= response.total_count as usize {
                break;
            }
            page += 1;
        }

        info!(query = %query, count = txs.len(), "searched transactions");
        Ok(txs)
    }

    /// Attaches inclusion and delivery proofs to the successfully executed transactions of `txs`.
    ///
    /// Block results are fetched once per height.
    pub async fn prove_transactions(&self, txs: Vec<SearchedTx>) -> Result<Vec<TxValue>> {
        let mut block_results: HashMap<u64, Vec<TxExecResult>> = HashMap::new();
        let mut proven = Vec::with_capacity(txs.len());

        for tx in txs {
            if tx.result.code != 0 {
                debug!(hash = %tx.hash, height = tx.height, code = tx.result.code, "skipping failed transaction");
                continue;
            }

            let inclusion_proof = tx
                .proof
                .ok_or_else(|| ClientError::Decode(format!("transaction {} has no inclusion proof", tx.hash)))?;

            if !block_results.contains_key(&tx.height) {
                let results = self.rpc.block_results(tx.height).await?;
                block_results.insert(tx.height, results);
            }
            let results = block_results.get(&tx.height).map(Vec::as_slice).unwrap_or_default();

            let delivery_proof = merkle::delivery_proof(results, tx.index as usize).ok_or_else(|| {
                ClientError::Decode(format!(
                    "block {} has {} results, no result for transaction index {}",
                    tx.height,
                    results.len(),
                    tx.index
                ))
            })?;

            proven.push(TxValue {
                tx: tx.tx,
                height: tx.height,
                inclusion_proof,
                delivery_proof,
            });
        }

        Ok(proven)
    }
}

fn operand(value: FilterValue<'_>) -> Operand {
    match value {
        FilterValue::Str(s) => Operand::from(s),
        FilterValue::Uint(v) => Operand::from(v),
        FilterValue::Int(v) => Operand::from(v),
        FilterValue::Float(v) => Operand::from(v),
    }
}

/// Turns a transactions filter into a tendermint event query, ANDing every condition.
pub fn build_query(filter: &TransactionsFilter) -> Result<Query> {
    let mut query: Option<Query> = None;

    for item in filter.items() {
        let op = item.op()?;
        let value = operand(item.operand()?);
        let field = item.field.clone();

        query = Some(match (query, op) {
            (None, FilterOp::Eq) => Query::eq(field, value),
            (None, FilterOp::Gt) => Query::gt(field, value),
            (None, FilterOp::Gte) => Query::gte(field, value),
            (None, FilterOp::Lt) => Query::lt(field, value),
            (None, FilterOp::Lte) => Query::lte(field, value),
            (Some(q), FilterOp::Eq) => q.and_eq(field, value),
            (Some(q), FilterOp::Gt) => q.and_gt(field, value),
            (Some(q), FilterOp::Gte) => q.and_gte(field, value),
            (Some(q), FilterOp::Lt) => q.and_lt(field, value),
            (Some(q), FilterOp::Lte) => q.and_lte(field, value),
        });
    }

    query.ok_or_else(|| ClientError::Decode("transactions filter has no conditions".to_string()))
}
