pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod memory_store;
pub mod retry;
pub mod scoring;
pub mod service;
pub mod statistics;
pub mod store;
pub mod validation;

// Re-export main components
pub use cleanup::*;
pub use clock::*;
pub use config::*;
pub use error::{FailureClass, LedgerError};
pub use ledger::*;
pub use memory_store::*;
pub use retry::*;
pub use scoring::*;
pub use service::*;
pub use statistics::*;
pub use store::*;
pub use validation::*;
