//! Proofer fetches proven module state of the target chain for KV queries and
//! proven transactions for TX queries.

pub mod keys;
pub mod kv;
pub mod tx;

use cosmos_rpc_client::{ChainReader, TendermintRpc};
use icq_types::{ModuleKeySpec, StorageValue};
use tracing::debug;

use crate::error::RelayError;
use keys::KeyDerivation;

pub use kv::KvQueryProcessor;
pub use tx::{ChainTxQuerier, TxQueryProcessor};

pub struct Proofer<R: ?Sized> {
    reader: ChainReader<R>,
    chain_prefix: String,
}

impl<R: TendermintRpc + ?Sized> Proofer<R> {
    pub fn new(reader: ChainReader<R>, chain_prefix: impl Into<String>) -> Self {
        Self {
            reader,
            chain_prefix: chain_prefix.into(),
        }
    }

    /// Proves the `denom` balance of `address`. A `height` of 0 reads the latest state.
    pub async fn get_balance(
        &self,
        height: u64,
        chain_prefix: &str,
        address: &str,
        denom: &str,
    ) -> Result<(Vec<StorageValue>, u64), RelayError> {
        let spec = ModuleKeySpec::Balance {
            address: address.to_string(),
            denom: denom.to_string(),
        };
        self.prove_with_prefix(height, chain_prefix, &spec).await
    }

    /// Proves every delegation of `delegator`. No delegations is an empty result.
    pub async fn get_delegator_delegations(
        &self,
        height: u64,
        chain_prefix: &str,
        delegator: &str,
    ) -> Result<(Vec<StorageValue>, u64), RelayError> {
        let spec = ModuleKeySpec::Delegations {
            delegator: delegator.to_string(),
        };
        self.prove_with_prefix(height, chain_prefix, &spec).await
    }

    /// Proves `spec` with the target chain prefix.
    pub async fn prove(&self, height: u64, spec: &ModuleKeySpec) -> Result<(Vec<StorageValue>, u64), RelayError> {
        self.prove_with_prefix(height, &self.chain_prefix, spec).await
    }

    async fn prove_with_prefix(
        &self,
        height: u64,
        chain_prefix: &str,
        spec: &ModuleKeySpec,
    ) -> Result<(Vec<StorageValue>, u64), RelayError> {
        match keys::derive(chain_prefix, spec)? {
            KeyDerivation::Exact { store_key, key } => {
                let (value, proven_height) = self.reader.query_tendermint_proof(height, &store_key, key).await?;
                Ok((vec![value], proven_height))
            }
            KeyDerivation::Prefix { store_key, prefix } => {
                let (values, proven_height) = self
                    .reader
                    .query_iterate_tendermint_proof(height, &store_key, prefix)
                    .await?;
                debug!(store_key, height = proven_height, count = values.len(), "proved prefix");
                Ok((values, proven_height))
            }
        }
    }
}
