use std::sync::Arc;

use async_trait::async_trait;
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::tendermint::chain::Id as ChainId;
use cosmrs::tx::{Body, Fee, SignDoc, SignerInfo};
use cosmrs::{Any, Coin};
use tracing::{debug, info, warn};

use crate::account::query_account;
use crate::error::{ClientError, Result};
use crate::rpc::TendermintRpc;
use crate::simulate::simulate_gas;
use crate::submitter::TxBroadcaster;
use crate::types::{BroadcastMode, SubmissionConfig};

/// Signs and broadcasts transactions on the submission chain.
///
/// Account state and gas are fetched fresh for every transaction, so at most one
/// `send` per signing key should be in flight at a time.
pub struct TxSender<R: ?Sized> {
    rpc: Arc<R>,
    config: SubmissionConfig,
    chain_id: ChainId,
    signing_key: SigningKey,
    sender_address: String,
}

impl<R: TendermintRpc + ?Sized> TxSender<R> {
    pub fn new(rpc: Arc<R>, config: SubmissionConfig, signing_key: SigningKey) -> Result<Self> {
        let chain_id: ChainId = config
            .chain_id
            .parse()
            .map_err(|e| ClientError::Configuration(format!("invalid chain id {}: {e}", config.chain_id)))?;

        let sender_address = signing_key
            .public_key()
            .account_id(&config.chain_prefix)
            .map_err(|e| ClientError::Configuration(format!("failed to derive sender address: {e}")))?
            .to_string();
        debug!("Derived sender address: {sender_address}");

        Ok(Self {
            rpc,
            config,
            chain_id,
            signing_key,
            sender_address,
        })
    }

    /// Creates a sender from a hex encoded secp256k1 secret key.
    pub fn from_hex_key(rpc: Arc<R>, config: SubmissionConfig, private_key_hex: &str) -> Result<Self> {
        let key_bytes = hex::decode(private_key_hex.trim().trim_start_matches("0x"))
            .map_err(|e| ClientError::Configuration(format!("failed to decode private key hex: {e}")))?;
        let signing_key = SigningKey::from_slice(&key_bytes)
            .map_err(|e| ClientError::Configuration(format!("invalid secp256k1 private key: {e}")))?;

        Self::new(rpc, config, signing_key)
    }

    /// Builds and signs a transaction with the given gas limit and the configured gas price.
    pub fn sign_tx(&self, messages: Vec<Any>, gas: u64, account_number: u64, sequence: u64) -> Result<Vec<u8>> {
        let price = &self.config.gas_price;
        let amount = Coin::new(price.fee_amount(gas)?, &price.denom)
            .map_err(|e| ClientError::Build(format!("invalid fee coin: {e}")))?;
        let fee = Fee::from_amount_and_gas(amount, gas);

        let body = Body::new(messages, self.config.memo.clone(), 0u32);
        let auth_info = SignerInfo::single_direct(Some(self.signing_key.public_key()), sequence).auth_info(fee);

        let sign_doc = SignDoc::new(&body, &auth_info, &self.chain_id, account_number)
            .map_err(|e| ClientError::Build(e.to_string()))?;
        let raw = sign_doc
            .sign(&self.signing_key)
            .map_err(|e| ClientError::Sign(e.to_string()))?;

        raw.to_bytes().map_err(|e| ClientError::Build(e.to_string()))
    }

    /// Broadcasts signed bytes and applies the success rule of the configured mode.
    ///
    /// Returns the transaction hash.
    pub async fn broadcast(&self, tx_bytes: Vec<u8>) -> Result<String> {
        let mode = self.config.broadcast_mode;
        match mode {
            BroadcastMode::Sync => {
                let response = self.rpc.broadcast_tx_sync(tx_bytes).await?;
                if response.code != 0 {
                    return Err(ClientError::Broadcast {
                        mode,
                        code: response.code,
                        log: response.log,
                    });
                }
                Ok(response.hash)
            }
            BroadcastMode::Async => {
                let response = self.rpc.broadcast_tx_async(tx_bytes).await?;
                info!(tx_hash = %response.hash, "transaction accepted without delivery guarantee");
                Ok(response.hash)
            }
            BroadcastMode::Commit => {
                let response = self.rpc.broadcast_tx_commit(tx_bytes).await?;
                if response.check_tx_code != 0 {
                    return Err(ClientError::Broadcast {
                        mode,
                        code: response.check_tx_code,
                        log: response.check_tx_log,
                    });
                }
                if response.tx_result_code != 0 {
                    return Err(ClientError::Broadcast {
                        mode,
                        code: response.tx_result_code,
                        log: response.tx_result_log,
                    });
                }
                debug!(tx_hash = %response.hash, height = response.height, "transaction committed");
                Ok(response.hash)
            }
        }
    }

    /// Queries the account, simulates gas, signs and broadcasts `messages` in one transaction.
    pub async fn send(&self, sender: &str, messages: Vec<Any>) -> Result<String> {
        let account = query_account(self.rpc.as_ref(), sender).await?;

        let gas = simulate_gas(
            self.rpc.as_ref(),
            &messages,
            &self.config.memo,
            account.sequence,
            &self.config.gas_adjustment,
        )
        .await?;

        let tx_bytes = self.sign_tx(messages, gas, account.number, account.sequence)?;

        match self.broadcast(tx_bytes).await {
            Ok(hash) => {
                info!(
                    tx_hash = %hash,
                    gas,
                    sequence = account.sequence,
                    mode = %self.config.broadcast_mode,
                    "Successfully broadcast transaction"
                );
                Ok(hash)
            }
            Err(e) => {
                warn!("Failed to broadcast transaction: {e}");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<R: TendermintRpc + ?Sized> TxBroadcaster for TxSender<R> {
    async fn send(&self, sender: &str, messages: Vec<Any>) -> Result<String> {
        TxSender::send(self, sender, messages).await
    }

    fn sender_address(&self) -> &str {
        &self.sender_address
    }
}
