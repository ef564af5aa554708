//! Interchain query types shared by the relayer crates.
//!
//! [`query`] holds what the querying chain registers, [`proof`] holds the proven
//! values the relayer fetches from the target chain and [`msg`] holds the protobuf
//! messages that carry those proofs back to the querying chain.

pub mod error;
pub mod msg;
pub mod proof;
pub mod query;

pub use error::{FilterError, ValidationError};
pub use msg::MsgSubmitQueryResult;
pub use proof::{MerkleProof, QueryResult, StorageValue, TxValue};
pub use query::{
    FilterOp, FilterValue, ModuleKeySpec, QueryType, RegisteredQuery, TransactionsFilter, TransactionsFilterItem,
    TX_HEIGHT_FIELD,
};
