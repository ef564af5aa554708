//! Protobuf messages for `neutron.interchainqueries.MsgSubmitQueryResult`.

use prost::Name;
use tendermint_proto::crypto::ProofOps;

use crate::error::ValidationError;
use crate::proof;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgSubmitQueryResult {
    #[prost(uint64, tag = "1")]
    pub query_id: u64,
    /// Bech32 address of the relayer account signing the submission
    #[prost(string, tag = "2")]
    pub sender: String,
    #[prost(string, tag = "3")]
    pub client_id: String,
    #[prost(message, optional, tag = "4")]
    pub result: Option<QueryResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResult {
    #[prost(message, repeated, tag = "1")]
    pub kv_results: Vec<StorageValue>,
    #[prost(message, repeated, tag = "2")]
    pub txs: Vec<TxValue>,
    /// Proof height of the kv results, zero for tx results
    #[prost(uint64, tag = "3")]
    pub height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StorageValue {
    #[prost(string, tag = "1")]
    pub storage_prefix: String,
    #[prost(bytes = "vec", tag = "2")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub proof: Option<ProofOps>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxValue {
    #[prost(message, optional, tag = "1")]
    pub inclusion_proof: Option<MerkleProof>,
    #[prost(message, optional, tag = "2")]
    pub delivery_proof: Option<MerkleProof>,
    #[prost(bytes = "vec", tag = "3")]
    pub tx: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MerkleProof {
    #[prost(int64, tag = "1")]
    pub total: i64,
    #[prost(int64, tag = "2")]
    pub index: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub leaf_hash: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub aunts: Vec<Vec<u8>>,
}

impl MsgSubmitQueryResult {
    pub const TYPE_URL: &'static str = "/neutron.interchainqueries.MsgSubmitQueryResult";

    pub fn new(query_id: u64, sender: String, result: proof::QueryResult) -> Self {
        Self {
            query_id,
            sender,
            client_id: String::new(),
            result: Some(result.into()),
        }
    }

    /// Stateless checks run before the message is signed and broadcast.
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.query_id == 0 {
            return Err(ValidationError::ZeroQueryId);
        }

        if self.sender.trim().is_empty() {
            return Err(ValidationError::EmptySender);
        }

        bech32::decode(&self.sender).map_err(|e| ValidationError::InvalidSender {
            address: self.sender.clone(),
            reason: e.to_string(),
        })?;

        let result = self.result.as_ref().ok_or(ValidationError::MissingResult)?;
        match (result.kv_results.is_empty(), result.txs.is_empty()) {
            (true, true) => return Err(ValidationError::EmptyResult),
            (false, false) => return Err(ValidationError::AmbiguousResult),
            _ => {}
        }

        if let Some(index) = result.kv_results.iter().position(|kv| kv.key.is_empty()) {
            return Err(ValidationError::EmptyKey(index));
        }

        for (index, tx) in result.txs.iter().enumerate() {
            if tx.inclusion_proof.is_none() {
                return Err(ValidationError::MissingTxProof {
                    index,
                    proof: "inclusion",
                });
            }
            if tx.delivery_proof.is_none() {
                return Err(ValidationError::MissingTxProof {
                    index,
                    proof: "delivery",
                });
            }
        }

        Ok(())
    }
}

impl Name for MsgSubmitQueryResult {
    const NAME: &'static str = "MsgSubmitQueryResult";
    const PACKAGE: &'static str = "neutron.interchainqueries";
}

impl From<proof::StorageValue> for StorageValue {
    fn from(value: proof::StorageValue) -> Self {
        Self {
            storage_prefix: value.storage_prefix,
            key: value.key,
            value: value.value,
            proof: Some(ProofOps { ops: value.proof_ops }),
        }
    }
}

impl From<proof::MerkleProof> for MerkleProof {
    fn from(proof: proof::MerkleProof) -> Self {
        Self {
            total: proof.total,
            index: proof.index,
            leaf_hash: proof.leaf_hash,
            aunts: proof.aunts,
        }
    }
}

impl From<proof::TxValue> for TxValue {
    fn from(value: proof::TxValue) -> Self {
        Self {
            inclusion_proof: Some(value.inclusion_proof.into()),
            delivery_proof: Some(value.delivery_proof.into()),
            tx: value.tx,
            height: value.height,
        }
    }
}

impl From<proof::QueryResult> for QueryResult {
    fn from(result: proof::QueryResult) -> Self {
        match result {
            proof::QueryResult::Kv { height, kv_results } => Self {
                kv_results: kv_results.into_iter().map(Into::into).collect(),
                txs: Vec::new(),
                height,
            },
            proof::QueryResult::Tx { txs } => Self {
                kv_results: Vec::new(),
                txs: txs.into_iter().map(Into::into).collect(),
                height: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use bech32::{Bech32, Hrp};
    use prost::Message;
    use tendermint_proto::crypto::ProofOp;

    use super::*;

    fn sender() -> String {
        bech32::encode::<Bech32>(Hrp::parse("neutron").unwrap(), &[7u8; 20]).unwrap()
    }

    fn storage_value() -> proof::StorageValue {
        proof::StorageValue {
            storage_prefix: "bank".to_string(),
            key: vec![0x02, 0x14, 0xaa],
            value: vec![0x0a, 0x05],
            proof_ops: vec![ProofOp {
                r#type: "ics23:iavl".to_string(),
                key: vec![0x02, 0x14, 0xaa],
                data: vec![1, 2, 3],
            }],
        }
    }

    fn tx_value(height: u64) -> proof::TxValue {
        proof::TxValue {
            tx: vec![0xde, 0xad],
            height,
            inclusion_proof: proof::MerkleProof {
                total: 2,
                index: 1,
                leaf_hash: vec![9; 32],
                aunts: vec![vec![8; 32]],
            },
            delivery_proof: proof::MerkleProof {
                total: 2,
                index: 1,
                leaf_hash: vec![6; 32],
                aunts: vec![vec![5; 32]],
            },
        }
    }

    #[test]
    fn test_kv_result_is_valid() {
        let msg = MsgSubmitQueryResult::new(
            1,
            sender(),
            proof::QueryResult::Kv {
                height: 100,
                kv_results: vec![storage_value()],
            },
        );
        assert_eq!(msg.validate_basic(), Ok(()));

        let result = msg.result.as_ref().unwrap();
        assert_eq!(result.height, 100);
        assert!(result.txs.is_empty());
        assert_eq!(result.kv_results[0].proof.as_ref().unwrap().ops.len(), 1);
    }

    #[test]
    fn test_tx_result_has_no_height() {
        let msg = MsgSubmitQueryResult::new(3, sender(), proof::QueryResult::Tx { txs: vec![tx_value(42)] });
        assert_eq!(msg.validate_basic(), Ok(()));

        let result = msg.result.as_ref().unwrap();
        assert_eq!(result.height, 0);
        assert!(result.kv_results.is_empty());
        assert_eq!(result.txs[0].height, 42);
    }

    #[test]
    fn test_both_shapes_are_rejected() {
        let mut msg = MsgSubmitQueryResult::new(
            1,
            sender(),
            proof::QueryResult::Kv {
                height: 100,
                kv_results: vec![storage_value()],
            },
        );
        msg.result.as_mut().unwrap().txs.push(tx_value(5).into());

        assert_eq!(msg.validate_basic(), Err(ValidationError::AmbiguousResult));
    }

    #[test]
    fn test_structural_failures() {
        let empty = MsgSubmitQueryResult::new(1, sender(), proof::QueryResult::Tx { txs: vec![] });
        assert_eq!(empty.validate_basic(), Err(ValidationError::EmptyResult));

        let zero_id = MsgSubmitQueryResult::new(0, sender(), proof::QueryResult::Tx { txs: vec![tx_value(1)] });
        assert_eq!(zero_id.validate_basic(), Err(ValidationError::ZeroQueryId));

        let no_sender = MsgSubmitQueryResult::new(1, String::new(), proof::QueryResult::Tx { txs: vec![tx_value(1)] });
        assert_eq!(no_sender.validate_basic(), Err(ValidationError::EmptySender));

        let bad_sender = MsgSubmitQueryResult::new(
            1,
            "not-an-address".to_string(),
            proof::QueryResult::Tx { txs: vec![tx_value(1)] },
        );
        assert!(matches!(
            bad_sender.validate_basic(),
            Err(ValidationError::InvalidSender { .. })
        ));

        let mut missing = MsgSubmitQueryResult::new(1, sender(), proof::QueryResult::Tx { txs: vec![tx_value(1)] });
        missing.result = None;
        assert_eq!(missing.validate_basic(), Err(ValidationError::MissingResult));

        let mut no_proof = MsgSubmitQueryResult::new(1, sender(), proof::QueryResult::Tx { txs: vec![tx_value(1)] });
        no_proof.result.as_mut().unwrap().txs[0].delivery_proof = None;
        assert_eq!(
            no_proof.validate_basic(),
            Err(ValidationError::MissingTxProof {
                index: 0,
                proof: "delivery"
            })
        );
    }

    #[test]
    fn test_message_encoding_keeps_result() {
        let msg = MsgSubmitQueryResult::new(9, sender(), proof::QueryResult::Tx { txs: vec![tx_value(12)] });
        let decoded = MsgSubmitQueryResult::decode(msg.encode_to_vec().as_slice()).expect("failed to decode");

        assert_eq!(decoded, msg);
        assert_eq!(MsgSubmitQueryResult::type_url(), MsgSubmitQueryResult::TYPE_URL);
    }
}
