//! Watch-driven registry synchronization.
//!
//! The synchronizer keeps the registry an eventually-consistent mirror of
//! the remote objects matching the managed-label selector. Rather than
//! patching the registry per event, every observed change of any kind
//! triggers a full re-list of the selector scope followed by a two-pass
//! reconciliation (upsert, then evict). The relist costs one list call per
//! change, proportional to the managed-entity count, and in exchange stays
//! correct under event coalescing, reordering and dropped notifications.

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::BackoffPolicy;
use crate::remote::LabelSelector;
use crate::remote::ResourceClient;
use crate::store::Registry;
use crate::Result;

pub struct WatchSynchronizer {
    client: Arc<dyn ResourceClient>,
    registry: Arc<Registry>,
    selector: LabelSelector,
    backoff: BackoffPolicy,
}

impl WatchSynchronizer {
    pub(crate) fn new(
        client: Arc<dyn ResourceClient>,
        registry: Arc<Registry>,
        selector: LabelSelector,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            client,
            registry,
            selector,
            backoff,
        }
    }

    /// Runs until the token is cancelled or the resubscription budget is
    /// exhausted. Each (re)subscription starts with a full resync, since
    /// events may have been missed while unsubscribed; afterwards every
    /// delivered event triggers one resync. No registry mutation happens
    /// after cancellation.
    pub async fn run(
        self,
        shutdown: CancellationToken,
    ) {
        info!("watch synchronizer starting");
        let mut attempts = 0;

        'subscribe: loop {
            let mut events = match self.client.watch(&self.selector).await {
                Ok(events) => events,
                Err(err) => {
                    if !self.backoff.should_retry(attempts) {
                        error!("watch subscription failed, retries exhausted: {err}");
                        return;
                    }
                    attempts += 1;
                    warn!(
                        "watch subscription failed ({err}), resubscribing (attempt {attempts})"
                    );

                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            info!("watch synchronizer stopped");
                            return;
                        }
                        _ = sleep(self.backoff.delay_for(attempts)) => continue 'subscribe,
                    }
                }
            };
            attempts = 0;

            if let Err(err) = self.resync().await {
                warn!("initial resync failed: {err}");
            }

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("watch synchronizer stopped");
                        return;
                    }
                    event = events.next() => match event {
                        Some(event) => {
                            debug!("observed change on {}", event.name());
                            if let Err(err) = self.resync().await {
                                warn!("resync failed: {err}");
                            }
                        }
                        None => {
                            if !self.backoff.should_retry(attempts) {
                                error!("watch stream ended, retries exhausted");
                                return;
                            }
                            attempts += 1;
                            warn!("watch stream ended, resubscribing (attempt {attempts})");

                            tokio::select! {
                                _ = shutdown.cancelled() => {
                                    info!("watch synchronizer stopped");
                                    return;
                                }
                                _ = sleep(self.backoff.delay_for(attempts)) => continue 'subscribe,
                            }
                        }
                    }
                }
            }
        }
    }

    /// One full reconciliation: list the selector scope, then upsert/evict
    /// the registry to match.
    async fn resync(&self) -> Result<()> {
        let listed = self.client.list(&self.selector).await?;
        debug!("syncing local registry against {} remote objects", listed.len());
        self.registry.reconcile(listed).await;
        Ok(())
    }
}
