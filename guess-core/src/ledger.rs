use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use guess_types::{GuessData, GuessSubmission, HidingSpot};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{LedgerError, Result};
use crate::retry::RetryPolicy;
use crate::scoring::ScoringEngine;
use crate::store::OrderedStore;
use crate::validation::{
    guess_collection_key, guess_key, guesser_key, validate_game_id, validate_guess_data,
};

// Score bounds covering every timestamp
pub(crate) const SCORE_MIN: f64 = f64::MIN;
pub(crate) const SCORE_MAX: f64 = f64::MAX;

pub(crate) fn decode_guess(operation: &'static str, member: &str) -> Result<GuessData> {
    serde_json::from_str(member).map_err(|err| {
        LedgerError::data(operation, format!("unreadable guess record: {err}"))
    })
}

/// Append-only record of every guess made in a game.
///
/// Guesses live in one ordered collection per game, scored by their
/// submission timestamp. The ledger is the only writer of that collection.
pub struct GuessLedger {
    store: Arc<dyn OrderedStore>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl GuessLedger {
    pub fn new(
        store: Arc<dyn OrderedStore>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            retry,
            clock,
            ttl,
        }
    }

    pub async fn record_guess(
        &self,
        game_id: &str,
        submission: &GuessSubmission,
        hiding_spot: &HidingSpot,
    ) -> Result<GuessData> {
        validate_game_id(game_id)?;
        validate_guess_data(submission)?;

        let outcome = ScoringEngine::evaluate_guess(submission, hiding_spot);
        let timestamp = self.clock.now_millis();

        let guess = GuessData {
            game_id: game_id.to_string(),
            user_id: submission.user_id.clone(),
            username: submission.username.clone(),
            object_key: submission.object_key.clone(),
            rel_x: submission.rel_x,
            rel_y: submission.rel_y,
            is_correct: outcome.is_correct,
            distance: outcome.distance,
            timestamp,
        };

        let member = serde_json::to_string(&guess)
            .map_err(|err| LedgerError::data("record_guess", err.to_string()))?;

        let store = self.store.as_ref();
        let key = guess_collection_key(game_id);
        let key = key.as_str();
        let member = member.as_str();
        let score = timestamp as f64;
        let ttl_secs = self.ttl.as_secs();

        // Members are deterministic, so a retried add after a lost reply is a no-op
        self.retry
            .run("record_guess", game_id, move || {
                store.add_to_ordered_collection(key, score, member)
            })
            .await?;
        // The guess is committed; a missed TTL refresh is picked up by the next write
        if let Err(err) = self
            .retry
            .run("expire_guesses", game_id, move || store.set_expiry(key, ttl_secs))
            .await
        {
            warn!(
                game_id,
                error = %err,
                "Recorded guess but failed to refresh collection expiry"
            );
        }

        info!(
            "Recorded guess {} (correct: {}, distance: {:.4})",
            guess_key(game_id, &guess.user_id, timestamp),
            guess.is_correct,
            guess.distance
        );

        Ok(guess)
    }

    /// Every guess for the game, most recent first
    pub async fn get_guesses(&self, game_id: &str) -> Result<Vec<GuessData>> {
        validate_game_id(game_id)?;

        let store = self.store.as_ref();
        let key = guess_collection_key(game_id);
        let key = key.as_str();

        let members = self
            .retry
            .run("get_guesses", game_id, move || {
                store.range_by_score_descending(key, SCORE_MIN, SCORE_MAX)
            })
            .await?;

        debug!("Loaded {} guesses for game {}", members.len(), game_id);

        members
            .iter()
            .map(|scored| decode_guess("get_guesses", &scored.member))
            .collect()
    }

    /// Latest guess of each distinct player, most recently active players first
    pub async fn get_unique_guessers(&self, game_id: &str) -> Result<Vec<GuessData>> {
        let guesses = self.get_guesses(game_id).await?;
        Ok(latest_per_user(game_id, guesses))
    }

    pub async fn get_latest_guess(&self, game_id: &str, user_id: &str) -> Result<Option<GuessData>> {
        let guesses = self.get_guesses(game_id).await?;
        Ok(guesses.into_iter().find(|guess| guess.user_id == user_id))
    }
}

/// Keep the first occurrence of each user in a most-recent-first listing
pub fn latest_per_user(game_id: &str, guesses: Vec<GuessData>) -> Vec<GuessData> {
    let mut seen = HashSet::new();
    guesses
        .into_iter()
        .filter(|guess| seen.insert(guesser_key(game_id, &guess.user_id)))
        .collect()
}
