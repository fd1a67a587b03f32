use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameId, UserId};

/// Ground truth for a game: which object is hidden and where, in normalized
/// `[0, 1]` scene coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HidingSpot {
    pub object_key: String,
    pub rel_x: f64,
    pub rel_y: f64,
}

/// The player-supplied part of a guess, before it is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GuessSubmission {
    pub user_id: UserId,
    pub username: String,
    pub object_key: String,
    pub rel_x: f64,
    pub rel_y: f64,
}

/// A recorded guess event. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GuessData {
    pub game_id: GameId,
    pub user_id: UserId,
    pub username: String,
    pub object_key: String,
    pub rel_x: f64,
    pub rel_y: f64,
    pub is_correct: bool,
    pub distance: f64,
    #[ts(type = "number")]
    pub timestamp: i64, // epoch milliseconds
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GuessStatistics {
    #[ts(type = "number")]
    pub total_guesses: u64,
    #[ts(type = "number")]
    pub correct_guesses: u64,
    #[ts(type = "number")]
    pub unique_guessers: u64,
    pub average_distance: f64,
}
