use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cosmos_rpc_client::{ChainReader, HttpRpc, ProofSubmitter, TxBroadcaster, TxSender};
use storage::RocksDbHeightStore;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::commands::cli::VERSION;
use crate::config::{Config, SIGNER_KEY_ENV};
use crate::proofer::{ChainTxQuerier, KvQueryProcessor, Proofer, TxQueryProcessor};
use crate::relay::{ConfiguredQuerySource, Relayer};

pub fn init() -> Result<()> {
    Config::init()
}

pub async fn start() -> Result<()> {
    let config = Config::load()?;
    let signer_key = std::env::var(SIGNER_KEY_ENV).with_context(|| format!("{SIGNER_KEY_ENV} is not set"))?;

    let target = Arc::new(HttpRpc::new(
        &config.target_chain.rpc_address,
        config.target_chain.timeout(),
    )?);
    let submission = Arc::new(HttpRpc::new(
        &config.submission_chain.rpc_address,
        config.submission_chain.timeout(),
    )?);
    info!(
        target_chain = target.address(),
        submission_chain = submission.address(),
        "Connecting to chains"
    );

    let sender = TxSender::from_hex_key(submission, config.submission_chain.submission_config()?, &signer_key)?;
    info!(
        sender = sender.sender_address(),
        chain_id = %config.submission_chain.chain_id,
        mode = %config.submission_chain.broadcast_mode,
        "Submitting query results"
    );
    let submitter = Arc::new(ProofSubmitter::new(sender));

    let reader = ChainReader::new(target);
    let proofer = Proofer::new(reader.clone(), config.target_chain.chain_prefix.clone());
    let kv_processor = Arc::new(KvQueryProcessor::new(proofer, submitter.clone()));
    let tx_processor = Arc::new(TxQueryProcessor::new(reader.clone(), submitter));
    let tx_querier = Arc::new(ChainTxQuerier::new(reader, config.target_chain.tx_search_page_size));

    let storage_path = config.storage_path()?;
    if let Some(parent) = storage_path.parent() {
        fs::create_dir_all(parent)?;
    }
    info!("Opening height store at {}", storage_path.display());
    let storage = Arc::new(RocksDbHeightStore::new(&storage_path)?);

    let relayer = Relayer::new(tx_querier, tx_processor, kv_processor, storage, None);

    let (task_tx, task_rx) = mpsc::channel(config.queue_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let source = ConfiguredQuerySource::new(config.queries, Duration::from_secs(config.poll_interval_secs.max(1)));
    let source_handle = tokio::spawn(source.run(task_tx, shutdown_rx.clone()));

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {e}"),
        }
        let _ = shutdown_tx.send(true);
    });

    let result = relayer.run(task_rx, shutdown_rx).await;
    source_handle.abort();
    result?;

    info!("Relayer stopped");
    Ok(())
}

pub fn version() {
    println!("version: {VERSION}");
}
