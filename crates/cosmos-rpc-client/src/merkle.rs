//! RFC 6962 Merkle trees as CometBFT builds them over block data and block results.

use icq_types::MerkleProof;
use prost::Message;
use sha2::{Digest, Sha256};

use crate::rpc::TxExecResult;

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

pub fn leaf_hash(leaf: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

pub fn inner_hash(left: &[u8], right: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([INNER_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Largest power of two strictly below `n`, for `n > 1`.
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

pub fn root_hash<T: AsRef<[u8]>>(items: &[T]) -> [u8; 32] {
    match items.len() {
        0 => Sha256::digest(b"").into(),
        1 => leaf_hash(items[0].as_ref()),
        n => {
            let k = split_point(n);
            inner_hash(&root_hash(&items[..k]), &root_hash(&items[k..]))
        }
    }
}

fn aunts<T: AsRef<[u8]>>(items: &[T], index: usize) -> Vec<Vec<u8>> {
    if items.len() <= 1 {
        return Vec::new();
    }
    let k = split_point(items.len());
    if index < k {
        let mut path = aunts(&items[..k], index);
        path.push(root_hash(&items[k..]).to_vec());
        path
    } else {
        let mut path = aunts(&items[k..], index - k);
        path.push(root_hash(&items[..k]).to_vec());
        path
    }
}

/// Audit path of `items[index]`, aunts ordered from the leaf's sibling up to the root.
pub fn audit_path<T: AsRef<[u8]>>(items: &[T], index: usize) -> Option<MerkleProof> {
    let item = items.get(index)?;
    Some(MerkleProof {
        total: items.len() as i64,
        index: index as i64,
        leaf_hash: leaf_hash(item.as_ref()).to_vec(),
        aunts: aunts(items, index),
    })
}

/// Deterministic encoding of an execution result, the leaf committed in `LastResultsHash`.
pub fn encode_exec_result(result: &TxExecResult) -> Vec<u8> {
    tendermint_proto::abci::ExecTxResult {
        code: result.code,
        data: result.data.clone().into(),
        gas_wanted: result.gas_wanted,
        gas_used: result.gas_used,
        ..Default::default()
    }
    .encode_to_vec()
}

/// Proves the execution result at `index` is part of the block's results.
pub fn delivery_proof(results: &[TxExecResult], index: usize) -> Option<MerkleProof> {
    let leaves: Vec<Vec<u8>> = results.iter().map(encode_exec_result).collect();
    audit_path(&leaves, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_from_path(leaf: &[u8], index: usize, total: usize, aunts: &[Vec<u8>]) -> Vec<u8> {
        if total == 1 {
            assert!(aunts.is_empty());
            return leaf.to_vec();
        }
        let (last, rest) = aunts.split_last().expect("path too short");
        let k = split_point(total);
        if index < k {
            inner_hash(&root_from_path(leaf, index, k, rest), last).to_vec()
        } else {
            inner_hash(last, &root_from_path(leaf, index - k, total - k, rest)).to_vec()
        }
    }

    #[test]
    fn test_split_point() {
        assert_eq!(split_point(2), 1);
        assert_eq!(split_point(3), 2);
        assert_eq!(split_point(4), 2);
        assert_eq!(split_point(5), 4);
        assert_eq!(split_point(9), 8);
    }

    #[test]
    fn test_two_leaf_root() {
        let items = [b"a".to_vec(), b"b".to_vec()];
        assert_eq!(root_hash(&items), inner_hash(&leaf_hash(b"a"), &leaf_hash(b"b")));
    }

    #[test]
    fn test_audit_paths_lead_to_root() {
        for total in 1..=9usize {
            let items: Vec<Vec<u8>> = (0..total).map(|i| vec![i as u8; i + 1]).collect();
            let root = root_hash(&items);

            for index in 0..total {
                let proof = audit_path(&items, index).unwrap();
                assert_eq!(proof.total, total as i64);
                assert_eq!(proof.index, index as i64);
                assert_eq!(
                    root_from_path(&proof.leaf_hash, index, total, &proof.aunts),
                    root.to_vec(),
                    "total={total} index={index}"
                );
            }
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let items = [b"a".to_vec()];
        assert!(audit_path(&items, 1).is_none());
        assert!(delivery_proof(&[], 0).is_none());
    }

    #[test]
    fn test_delivery_proof_leaf() {
        let ok = TxExecResult {
            code: 0,
            data: vec![1, 2],
            gas_wanted: 200_000,
            gas_used: 150_000,
        };
        let failed = TxExecResult {
            code: 11,
            data: vec![],
            gas_wanted: 100_000,
            gas_used: 100_000,
        };
        let results = vec![failed, ok.clone()];

        let proof = delivery_proof(&results, 1).unwrap();
        assert_eq!(proof.leaf_hash, leaf_hash(&encode_exec_result(&ok)).to_vec());
        assert_eq!(proof.aunts.len(), 1);
    }
}
