use std::sync::Arc;

use guess_types::{GuessData, GuessStatistics, GuessSubmission, HidingSpot};
use tracing::warn;

use crate::clock::{Clock, MonotonicClock};
use crate::config::{LedgerConfig, StatsRefresh};
use crate::error::Result;
use crate::ledger::GuessLedger;
use crate::statistics::StatisticsAggregator;
use crate::store::OrderedStore;

/// Entry point for the API layer: records guesses and serves the derived views.
pub struct GuessService {
    ledger: GuessLedger,
    aggregator: Arc<StatisticsAggregator>,
    stats_refresh: StatsRefresh,
}

impl GuessService {
    pub fn new(store: Arc<dyn OrderedStore>, config: LedgerConfig) -> Self {
        Self::with_clock(store, config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        store: Arc<dyn OrderedStore>,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = GuessLedger::new(
            store.clone(),
            config.retry.clone(),
            clock,
            config.guess_ttl,
        );
        let aggregator = Arc::new(StatisticsAggregator::new(
            store,
            config.retry,
            config.guess_ttl,
        ));

        Self {
            ledger,
            aggregator,
            stats_refresh: config.stats_refresh,
        }
    }

    pub fn ledger(&self) -> &GuessLedger {
        &self.ledger
    }

    pub fn aggregator(&self) -> &StatisticsAggregator {
        &self.aggregator
    }

    /// Record a guess, then bring the statistics cache up to date.
    ///
    /// The guess is the authoritative event: once it is stored this returns
    /// `Ok` even if refreshing the statistics fails.
    pub async fn record_guess(
        &self,
        game_id: &str,
        submission: &GuessSubmission,
        hiding_spot: &HidingSpot,
    ) -> Result<GuessData> {
        let guess = self
            .ledger
            .record_guess(game_id, submission, hiding_spot)
            .await?;

        match self.stats_refresh {
            StatsRefresh::Inline => refresh_statistics(&self.aggregator, game_id).await,
            StatsRefresh::Background => {
                let aggregator = self.aggregator.clone();
                let game_id = game_id.to_string();
                tokio::spawn(async move {
                    refresh_statistics(&aggregator, &game_id).await;
                });
            }
        }

        Ok(guess)
    }

    pub async fn get_guesses(&self, game_id: &str) -> Result<Vec<GuessData>> {
        self.ledger.get_guesses(game_id).await
    }

    pub async fn get_unique_guessers(&self, game_id: &str) -> Result<Vec<GuessData>> {
        self.ledger.get_unique_guessers(game_id).await
    }

    pub async fn get_latest_guess(&self, game_id: &str, user_id: &str) -> Result<Option<GuessData>> {
        self.ledger.get_latest_guess(game_id, user_id).await
    }

    pub async fn get_guess_statistics(&self, game_id: &str) -> Result<GuessStatistics> {
        self.aggregator.get_guess_statistics(game_id).await
    }
}

async fn refresh_statistics(aggregator: &StatisticsAggregator, game_id: &str) {
    if let Err(err) = aggregator.refresh(game_id).await {
        warn!(
            game_id,
            error = %err,
            "Failed to refresh statistics after recording guess"
        );
    }
}
