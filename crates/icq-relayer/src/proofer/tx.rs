use std::sync::Arc;

use async_trait::async_trait;
use cosmos_rpc_client::rpc::SearchedTx;
use cosmos_rpc_client::{ChainReader, Submitter, TendermintRpc};
use icq_types::TransactionsFilter;
use tracing::{info, warn};

use crate::error::RelayError;
use crate::relay::{TxProcessor, TxQuerier};

/// Searches transactions of the target chain, every page of them.
pub struct ChainTxQuerier<R: ?Sized> {
    reader: ChainReader<R>,
    page_size: u8,
}

impl<R: TendermintRpc + ?Sized> ChainTxQuerier<R> {
    pub fn new(reader: ChainReader<R>, page_size: u8) -> Self {
        Self { reader, page_size }
    }
}

#[async_trait]
impl<R: TendermintRpc + ?Sized> TxQuerier for ChainTxQuerier<R> {
    async fn search_transactions(&self, filter: &TransactionsFilter) -> Result<Vec<SearchedTx>, RelayError> {
        Ok(self.reader.search_transactions(filter, self.page_size).await?)
    }
}

/// Proves found transactions and submits them in a single message.
pub struct TxQueryProcessor<R: ?Sized, S: ?Sized> {
    reader: ChainReader<R>,
    submitter: Arc<S>,
}

impl<R: TendermintRpc + ?Sized, S: Submitter + ?Sized> TxQueryProcessor<R, S> {
    pub fn new(reader: ChainReader<R>, submitter: Arc<S>) -> Self {
        Self { reader, submitter }
    }
}

#[async_trait]
impl<R, S> TxProcessor for TxQueryProcessor<R, S>
where
    R: TendermintRpc + ?Sized,
    S: Submitter + ?Sized,
{
    async fn process_and_submit(&self, query_id: u64, txs: Vec<SearchedTx>) -> Result<Option<u64>, RelayError> {
        let Some(max_height) = txs.iter().map(|tx| tx.height).max() else {
            return Ok(None);
        };

        let found = txs.len();
        let proven = self.reader.prove_transactions(txs).await?;
        if proven.is_empty() {
            warn!(query_id, found, max_height, "Found transactions all failed, nothing to submit");
            return Ok(Some(max_height));
        }

        info!(query_id, found, proven = proven.len(), max_height, "Proved transactions");
        self.submitter.submit_tx_proof(query_id, proven).await?;
        Ok(Some(max_height))
    }
}

#[cfg(test)]
mod tests {
    use cosmos_rpc_client::mock::MockRpc;
    use cosmos_rpc_client::rpc::{TxExecResult, TxSearchPage};
    use icq_types::MerkleProof;

    use super::*;
    use crate::proofer::kv::tests::RecordingSubmitter;

    fn searched(height: u64, code: u32) -> SearchedTx {
        SearchedTx {
            hash: format!("TX{height}"),
            height,
            index: 0,
            result: TxExecResult {
                code,
                ..Default::default()
            },
            tx: vec![height as u8],
            proof: Some(MerkleProof {
                total: 1,
                index: 0,
                leaf_hash: vec![1; 32],
                aunts: vec![],
            }),
        }
    }

    fn processor(rpc: MockRpc) -> (TxQueryProcessor<MockRpc, RecordingSubmitter>, Arc<RecordingSubmitter>) {
        let submitter = Arc::new(RecordingSubmitter::default());
        (
            TxQueryProcessor::new(ChainReader::new(Arc::new(rpc)), submitter.clone()),
            submitter,
        )
    }

    #[tokio::test]
    async fn test_submits_proven_batch_and_reports_max_height() {
        let rpc = MockRpc::new()
            .with_block_results(12, vec![TxExecResult::default()])
            .with_block_results(30, vec![TxExecResult::default()]);
        let (processor, submitter) = processor(rpc);

        let height = processor
            .process_and_submit(4, vec![searched(12, 0), searched(30, 0)])
            .await
            .unwrap();

        assert_eq!(height, Some(30));
        let submitted = submitter.txs.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, 4);
        assert_eq!(submitted[0].1.iter().map(|tx| tx.height).collect::<Vec<_>>(), vec![12, 30]);
    }

    #[tokio::test]
    async fn test_no_transactions_moves_nothing() {
        let (processor, submitter) = processor(MockRpc::new());

        assert_eq!(processor.process_and_submit(4, vec![]).await.unwrap(), None);
        assert!(submitter.txs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_transactions_are_passed_over() {
        let (processor, submitter) = processor(MockRpc::new());

        let height = processor.process_and_submit(4, vec![searched(18, 11)]).await.unwrap();

        assert_eq!(height, Some(18));
        assert!(submitter.txs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_querier_follows_pages() {
        let rpc = Arc::new(MockRpc::new().with_search_pages(vec![
            TxSearchPage {
                txs: vec![searched(1, 0)],
                total_count: 2,
            },
            TxSearchPage {
                txs: vec![searched(2, 0)],
                total_count: 2,
            },
        ]));
        let querier = ChainTxQuerier::new(ChainReader::new(rpc.clone()), 1);

        let filter = TransactionsFilter::default().with_height_floor(0);
        let txs = querier.search_transactions(&filter).await.unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(rpc.searches().len(), 2);
    }
}
