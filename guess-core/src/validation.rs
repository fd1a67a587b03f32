use std::sync::LazyLock;

use guess_types::GuessSubmission;
use regex::Regex;
use thiserror::Error;

pub const MAX_GAME_ID_LENGTH: usize = 64;

// Keys are built as `game:{id}:...`, so ids must not carry separators.
static GAME_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("game id pattern is valid"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("game id is empty")]
    EmptyGameId,
    #[error("game id is {length} characters long, maximum is {max}")]
    GameIdTooLong { length: usize, max: usize },
    #[error("game id {0:?} contains disallowed characters")]
    GameIdCharacters(String),
    #[error("{axis} coordinate {value} is outside [0, 1]")]
    CoordinateOutOfRange { axis: &'static str, value: f64 },
    #[error("object key is empty")]
    EmptyObjectKey,
    #[error("user id is empty")]
    EmptyUserId,
    #[error("username is empty")]
    EmptyUsername,
}

impl ValidationError {
    /// Whether this error is about the game identifier rather than the guess payload
    pub fn is_identifier_error(&self) -> bool {
        matches!(
            self,
            ValidationError::EmptyGameId
                | ValidationError::GameIdTooLong { .. }
                | ValidationError::GameIdCharacters(_)
        )
    }
}

pub fn validate_game_id(game_id: &str) -> Result<(), ValidationError> {
    if game_id.is_empty() {
        return Err(ValidationError::EmptyGameId);
    }

    let length = game_id.chars().count();
    if length > MAX_GAME_ID_LENGTH {
        return Err(ValidationError::GameIdTooLong {
            length,
            max: MAX_GAME_ID_LENGTH,
        });
    }

    if !GAME_ID_PATTERN.is_match(game_id) {
        return Err(ValidationError::GameIdCharacters(game_id.to_string()));
    }

    Ok(())
}

pub fn validate_guess_data(guess: &GuessSubmission) -> Result<(), ValidationError> {
    // NaN fails the range check as well
    for (axis, value) in [("x", guess.rel_x), ("y", guess.rel_y)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::CoordinateOutOfRange { axis, value });
        }
    }

    if guess.object_key.trim().is_empty() {
        return Err(ValidationError::EmptyObjectKey);
    }
    if guess.user_id.trim().is_empty() {
        return Err(ValidationError::EmptyUserId);
    }
    if guess.username.trim().is_empty() {
        return Err(ValidationError::EmptyUsername);
    }

    Ok(())
}

/// Key of the ordered collection holding every guess for a game
pub fn guess_collection_key(game_id: &str) -> String {
    format!("game:{game_id}:guesses")
}

/// Stable per-user prefix shared by every guess key of that user in a game
pub fn guesser_key(game_id: &str, user_id: &str) -> String {
    format!("game:{game_id}:guess:{user_id}")
}

pub fn guess_key(game_id: &str, user_id: &str, timestamp: i64) -> String {
    format!("{}:{timestamp}", guesser_key(game_id, user_id))
}

pub fn stats_key(game_id: &str) -> String {
    format!("game:{game_id}:stats")
}
