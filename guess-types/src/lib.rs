pub mod errors;
pub mod guess;
pub mod messages;

// Re-export all types
pub use errors::*;
pub use guess::*;
pub use messages::*;

pub type GameId = String;
pub type UserId = String;
