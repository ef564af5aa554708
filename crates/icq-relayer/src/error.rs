use cosmos_rpc_client::ClientError;
use icq_types::FilterError;
use storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Height store error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
