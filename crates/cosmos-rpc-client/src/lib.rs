//! Tendermint RPC client for interchain query relaying
//!
//! This crate reads proven key/value state and proven transactions from a target chain and
//! submits them as `MsgSubmitQueryResult` transactions to the querying chain. Every network
//! call goes through the [`TendermintRpc`] trait so the pipeline can run against any node.

pub mod account;
pub mod error;
pub mod merkle;
#[cfg(any(test, feature = "test"))]
pub mod mock;
pub mod reader;
pub mod rpc;
pub mod simulate;
pub mod submitter;
pub mod tx_sender;
pub mod types;

pub use account::Account;
pub use error::{ClientError, Result};
pub use reader::ChainReader;
pub use rpc::{HttpRpc, TendermintRpc};
pub use submitter::{ProofSubmitter, Submitter, TxBroadcaster};
pub use tx_sender::TxSender;
pub use types::{BroadcastMode, Decimal, GasPrice, SubmissionConfig};
