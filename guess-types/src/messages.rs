use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GuessSubmission, HidingSpot};

/// Body of `POST /games/{id}/guesses`. The hiding spot travels with the
/// request because it belongs to the game session, not to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecordGuessRequest {
    #[serde(flatten)]
    pub guess: GuessSubmission,
    pub hiding_spot: HidingSpot,
}
