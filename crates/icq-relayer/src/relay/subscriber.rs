use std::time::Duration;

use icq_types::RegisteredQuery;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::relay::shutdown_requested;

/// Feeds the task queue with the queries listed in the config, re-delivering them on every tick.
pub struct ConfiguredQuerySource {
    queries: Vec<RegisteredQuery>,
    interval: Duration,
}

impl ConfiguredQuerySource {
    pub fn new(queries: Vec<RegisteredQuery>, interval: Duration) -> Self {
        Self { queries, interval }
    }

    /// Runs until shutdown is signalled or the queue's receiver is dropped.
    pub async fn run(self, tasks: mpsc::Sender<RegisteredQuery>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        info!(queries = self.queries.len(), interval = ?self.interval, "Query source started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            for query in &self.queries {
                // A full queue holds the source back until the relayer catches up.
                let sent = tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut shutdown) => return,
                    sent = tasks.send(query.clone()) => sent,
                };
                if sent.is_err() {
                    debug!("Task queue closed, stopping query source");
                    return;
                }
            }
        }

        info!("Query source stopped");
    }
}
