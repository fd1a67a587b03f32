use guess_types::{GuessSubmission, HidingSpot};

/// Result of scoring one guess against the hiding spot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuessOutcome {
    pub is_correct: bool,
    pub distance: f64,
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Evaluate a guess against the hiding spot.
    ///
    /// Correctness is decided by the object key alone. Distance is the
    /// Euclidean distance in the normalized scene plane, and a correct guess
    /// always reports a distance of zero.
    pub fn evaluate_guess(guess: &GuessSubmission, spot: &HidingSpot) -> GuessOutcome {
        let is_correct = guess.object_key == spot.object_key;
        let distance = if is_correct {
            0.0
        } else {
            Self::distance(guess.rel_x, guess.rel_y, spot.rel_x, spot.rel_y)
        };

        GuessOutcome {
            is_correct,
            distance,
        }
    }

    pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
        (x1 - x2).hypot(y1 - y2)
    }
}
