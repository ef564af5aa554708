use icq_types::{FilterError, ValidationError};
use thiserror::Error;

use crate::types::BroadcastMode;

/// Result type for chain reads and submissions
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid transactions filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Query {path} failed with code {code}: {log}")]
    RemoteQuery { path: String, code: u32, log: String },

    #[error("Failed to query account {address}: {reason}")]
    AccountLookup { address: String, reason: String },

    #[error("Gas simulation failed: {0}")]
    Simulation(String),

    #[error("Failed to build transaction: {0}")]
    Build(String),

    #[error("Failed to sign transaction: {0}")]
    Sign(String),

    #[error("Broadcast in {mode} mode failed with code {code}: {log}")]
    Broadcast { mode: BroadcastMode, code: u32, log: String },

    #[error("Invalid submission message: {0}")]
    Validation(#[from] ValidationError),

    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl From<prost::DecodeError> for ClientError {
    fn from(e: prost::DecodeError) -> Self {
        ClientError::Decode(e.to_string())
    }
}
