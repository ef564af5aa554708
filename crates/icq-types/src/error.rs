use thiserror::Error;

/// Structural problems found by [`crate::MsgSubmitQueryResult::validate_basic`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query id cannot be equal zero")]
    ZeroQueryId,

    #[error("sender address is empty")]
    EmptySender,

    #[error("invalid sender address {address}: {reason}")]
    InvalidSender { address: String, reason: String },

    #[error("query result is missing")]
    MissingResult,

    #[error("query result is empty: neither kv results nor txs are set")]
    EmptyResult,

    #[error("query result cannot carry both kv results and txs")]
    AmbiguousResult,

    #[error("kv result #{0} has an empty key")]
    EmptyKey(usize),

    #[error("tx value #{index} is missing its {proof} proof")]
    MissingTxProof { index: usize, proof: &'static str },
}

/// Errors raised while reading a registered query's transactions filter.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("could not unmarshal transactions filter: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported filter operator {0:?}")]
    UnknownOp(String),

    #[error("unsupported filter value for field {field}: {value}")]
    UnsupportedValue { field: String, value: String },
}
