use tendermint_proto::crypto::ProofOp;

/// StorageValue is one key/value pair of a module store proven at some height.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageValue {
    /// Module store the key lives in, e.g. `bank`.
    pub storage_prefix: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Proof path from the value to the application hash, in the order the node returned it.
    pub proof_ops: Vec<ProofOp>,
}

/// MerkleProof is an audit path proving a leaf belongs to a committed root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleProof {
    pub total: i64,
    pub index: i64,
    pub leaf_hash: Vec<u8>,
    pub aunts: Vec<Vec<u8>>,
}

/// TxValue is a transaction together with proofs of its inclusion and successful execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxValue {
    pub tx: Vec<u8>,
    pub height: u64,
    /// Proves `tx` is part of the block at `height`.
    pub inclusion_proof: MerkleProof,
    /// Proves the execution result of `tx` is part of the block's results.
    pub delivery_proof: MerkleProof,
}

/// QueryResult is what gets submitted for a registered query: KV shaped or TX shaped, never both.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Kv { height: u64, kv_results: Vec<StorageValue> },
    Tx { txs: Vec<TxValue> },
}
