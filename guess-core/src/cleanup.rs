use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::OrderedStore;

/// Periodically drops expired game data from the store.
///
/// Expired keys already read as absent; the sweep only reclaims their space.
pub struct StoreCleanup {
    pub sweep_interval: Duration,
}

impl Default for StoreCleanup {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl StoreCleanup {
    pub fn new(sweep_interval: Duration) -> Self {
        Self { sweep_interval }
    }

    /// Run one sweep, returning how many keys were purged
    pub async fn sweep(&self, store: &dyn OrderedStore) -> usize {
        match store.purge_expired().await {
            Ok(0) => {
                debug!("Expiry sweep found nothing to purge");
                0
            }
            Ok(purged) => {
                info!("Expiry sweep purged {} keys", purged);
                purged
            }
            Err(err) => {
                warn!("Expiry sweep failed: {}", err);
                0
            }
        }
    }

    /// Sweep on a fixed interval until the runtime shuts down
    pub fn spawn(self, store: Arc<dyn OrderedStore>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.sweep_interval);
            loop {
                interval.tick().await;
                self.sweep(store.as_ref()).await;
            }
        })
    }
}
