use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use guess_types::{GuessData, GuessStatistics};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::{SCORE_MAX, SCORE_MIN, decode_guess};
use crate::retry::RetryPolicy;
use crate::store::OrderedStore;
use crate::validation::{guess_collection_key, stats_key, validate_game_id};

/// Summarize a game's guesses. Pure, so the same collection always yields the
/// same statistics.
pub fn compute_statistics(guesses: &[GuessData]) -> GuessStatistics {
    if guesses.is_empty() {
        return GuessStatistics::default();
    }

    let total_guesses = guesses.len() as u64;
    let correct_guesses = guesses.iter().filter(|guess| guess.is_correct).count() as u64;
    let unique_guessers = guesses
        .iter()
        .map(|guess| guess.user_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;
    let average_distance =
        guesses.iter().map(|guess| guess.distance).sum::<f64>() / guesses.len() as f64;

    GuessStatistics {
        total_guesses,
        correct_guesses,
        unique_guessers,
        average_distance,
    }
}

/// Read-through cache over a recomputable value
#[async_trait]
pub trait StatisticsCache: Send + Sync {
    /// Cached statistics, or `None` on a miss
    async fn try_read_cache(&self, game_id: &str) -> Result<Option<GuessStatistics>>;

    async fn write_cache(&self, game_id: &str, stats: &GuessStatistics) -> Result<()>;

    /// Statistics rebuilt from the full guess collection
    async fn recompute(&self, game_id: &str) -> Result<GuessStatistics>;

    /// Serve from the cache, falling back to a recompute on a miss. The
    /// recomputed value is returned even when it cannot be cached.
    async fn read_through(&self, game_id: &str) -> Result<GuessStatistics> {
        if let Some(stats) = self.try_read_cache(game_id).await? {
            return Ok(stats);
        }

        let stats = self.recompute(game_id).await?;
        if let Err(err) = self.write_cache(game_id, &stats).await {
            warn!(
                game_id,
                error = %err,
                "Serving recomputed statistics without caching them"
            );
        }
        Ok(stats)
    }
}

/// Statistics for each game, cached in the store next to the guess collection.
///
/// Recompute-and-write cycles for one game run one at a time, so a slow
/// cycle can never overwrite the snapshot of a later one.
pub struct StatisticsAggregator {
    store: Arc<dyn OrderedStore>,
    retry: RetryPolicy,
    ttl: Duration,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn OrderedStore>, retry: RetryPolicy, ttl: Duration) -> Self {
        Self {
            store,
            retry,
            ttl,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_guess_statistics(&self, game_id: &str) -> Result<GuessStatistics> {
        validate_game_id(game_id)?;

        if let Some(stats) = self.try_read_cache(game_id).await? {
            return Ok(stats);
        }

        let lock = self.refresh_lock(game_id).await;
        let _guard = lock.lock().await;
        // A refresh may have filled the cache while we waited
        self.read_through(game_id).await
    }

    /// Recompute and overwrite the cached statistics for a game
    pub async fn refresh(&self, game_id: &str) -> Result<GuessStatistics> {
        validate_game_id(game_id)?;

        let lock = self.refresh_lock(game_id).await;
        let _guard = lock.lock().await;

        let stats = self.recompute(game_id).await?;
        self.write_cache(game_id, &stats).await?;
        debug!(
            "Refreshed statistics for game {}: {} guesses",
            game_id, stats.total_guesses
        );
        Ok(stats)
    }

    async fn refresh_lock(&self, game_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        // Drop locks nobody holds or waits on
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(game_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl StatisticsCache for StatisticsAggregator {
    async fn try_read_cache(&self, game_id: &str) -> Result<Option<GuessStatistics>> {
        let store = self.store.as_ref();
        let key = stats_key(game_id);
        let key = key.as_str();

        let Some(raw) = self.retry.run("read_stats_cache", game_id, move || store.get(key)).await?
        else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(stats) => Ok(Some(stats)),
            Err(err) => {
                warn!(
                    game_id,
                    error = %err,
                    "Discarding unreadable statistics cache entry"
                );
                Ok(None)
            }
        }
    }

    async fn write_cache(&self, game_id: &str, stats: &GuessStatistics) -> Result<()> {
        let payload = serde_json::to_string(stats)
            .map_err(|err| LedgerError::data("write_stats_cache", err.to_string()))?;

        let store = self.store.as_ref();
        let key = stats_key(game_id);
        let key = key.as_str();
        let payload = payload.as_str();
        let ttl_secs = self.ttl.as_secs();

        self.retry
            .run("write_stats_cache", game_id, move || store.set(key, payload))
            .await?;
        self.retry
            .run("expire_stats_cache", game_id, move || {
                store.set_expiry(key, ttl_secs)
            })
            .await
    }

    async fn recompute(&self, game_id: &str) -> Result<GuessStatistics> {
        let store = self.store.as_ref();
        let key = guess_collection_key(game_id);
        let key = key.as_str();

        let members = self
            .retry
            .run("recompute_stats", game_id, move || {
                store.range_by_score_ascending(key, SCORE_MIN, SCORE_MAX)
            })
            .await?;

        let guesses = members
            .iter()
            .map(|scored| decode_guess("recompute_stats", &scored.member))
            .collect::<Result<Vec<_>>>()?;

        Ok(compute_statistics(&guesses))
    }
}
