use std::sync::Arc;

use async_trait::async_trait;
use cosmos_rpc_client::{Submitter, TendermintRpc};
use icq_types::ModuleKeySpec;
use tracing::{info, warn};

use crate::error::RelayError;
use crate::proofer::Proofer;
use crate::relay::KvProcessor;

/// Proves every key of a KV query at one height and submits them in a single message.
pub struct KvQueryProcessor<R: ?Sized, S: ?Sized> {
    proofer: Proofer<R>,
    submitter: Arc<S>,
}

impl<R: TendermintRpc + ?Sized, S: Submitter + ?Sized> KvQueryProcessor<R, S> {
    pub fn new(proofer: Proofer<R>, submitter: Arc<S>) -> Self {
        Self { proofer, submitter }
    }
}

#[async_trait]
impl<R, S> KvProcessor for KvQueryProcessor<R, S>
where
    R: TendermintRpc + ?Sized,
    S: Submitter + ?Sized,
{
    async fn process_and_submit(&self, query_id: u64, keys: &[ModuleKeySpec]) -> Result<(), RelayError> {
        // The first key is read at the latest height, the rest at the height it was served at.
        let mut height = 0;
        let mut values = Vec::new();
        for spec in keys {
            let (proven, proven_height) = self.proofer.prove(height, spec).await?;
            height = proven_height;
            values.extend(proven);
        }

        if values.is_empty() {
            warn!(query_id, height, "No values to submit for kv query");
            return Ok(());
        }

        info!(query_id, height, count = values.len(), "Proved kv query");
        self.submitter.submit_proof(height, query_id, values).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use bech32::{Bech32, Hrp};
    use cosmos_rpc_client::mock::MockRpc;
    use cosmos_rpc_client::{ChainReader, Result as ClientResult};
    use icq_types::{StorageValue, TxValue};

    use super::*;
    use crate::proofer::keys::{BANK_STORE_KEY, STAKING_STORE_KEY, balance_key, delegations_key};

    #[derive(Default)]
    pub(crate) struct RecordingSubmitter {
        pub kv: Mutex<Vec<(u64, u64, Vec<StorageValue>)>>,
        pub txs: Mutex<Vec<(u64, Vec<TxValue>)>>,
    }

    #[async_trait]
    impl Submitter for RecordingSubmitter {
        async fn submit_proof(&self, height: u64, query_id: u64, proofs: Vec<StorageValue>) -> ClientResult<()> {
            self.kv.lock().unwrap().push((height, query_id, proofs));
            Ok(())
        }

        async fn submit_tx_proof(&self, query_id: u64, proofs: Vec<TxValue>) -> ClientResult<()> {
            self.txs.lock().unwrap().push((query_id, proofs));
            Ok(())
        }
    }

    fn address(bytes: &[u8]) -> String {
        bech32::encode::<Bech32>(Hrp::parse("cosmos").unwrap(), bytes).unwrap()
    }

    fn processor(rpc: MockRpc) -> (KvQueryProcessor<MockRpc, RecordingSubmitter>, Arc<MockRpc>, Arc<RecordingSubmitter>) {
        let rpc = Arc::new(rpc);
        let submitter = Arc::new(RecordingSubmitter::default());
        let proofer = Proofer::new(ChainReader::new(rpc.clone()), "cosmos");
        (KvQueryProcessor::new(proofer, submitter.clone()), rpc, submitter)
    }

    #[tokio::test]
    async fn test_keys_are_batched_at_the_first_served_height() {
        let account = [4u8; 20];
        let denoms = ["uatom", "ibc/27394FB0"];
        let rpc = denoms.iter().fold(MockRpc::new().with_latest_height(321), |rpc, denom| {
            rpc.with_store_value(BANK_STORE_KEY, &balance_key(&account, denom).unwrap(), b"7")
        });
        let (processor, rpc, submitter) = processor(rpc);

        let keys: Vec<_> = denoms
            .iter()
            .map(|denom| ModuleKeySpec::Balance {
                address: address(&account),
                denom: denom.to_string(),
            })
            .collect();
        processor.process_and_submit(11, &keys).await.unwrap();

        let heights: Vec<_> = rpc.queries().iter().map(|q| q.height).collect();
        assert_eq!(heights, vec![0, 321]);

        let submitted = submitter.kv.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let (height, query_id, values) = &submitted[0];
        assert_eq!((*height, *query_id), (321, 11));
        assert_eq!(values.len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_to_prove_is_not_submitted() {
        let delegator = [2u8; 20];
        let (processor, _, submitter) = processor(MockRpc::new().with_subspace(
            STAKING_STORE_KEY,
            &delegations_key(&delegator).unwrap(),
            vec![],
        ));

        processor
            .process_and_submit(
                12,
                &[ModuleKeySpec::Delegations {
                    delegator: address(&delegator),
                }],
            )
            .await
            .unwrap();

        assert!(submitter.kv.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_proof_failure_skips_submission() {
        let (processor, _, submitter) = processor(MockRpc::new());

        let result = processor
            .process_and_submit(
                13,
                &[ModuleKeySpec::Raw {
                    store_key: "acc".to_string(),
                    key: vec![1],
                }],
            )
            .await;

        assert!(matches!(result, Err(RelayError::Client(_))));
        assert!(submitter.kv.lock().unwrap().is_empty());
    }
}
