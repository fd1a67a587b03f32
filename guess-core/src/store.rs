use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by an [`OrderedStore`] implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Transient failure talking to the store; the call may succeed if repeated.
    #[error("store connection error: {0}")]
    Connection(String),
    /// The store answered, but with something we cannot use.
    #[error("store data error: {0}")]
    Data(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A member of an ordered collection together with its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

/// Ordered key/value service the ledger is persisted in.
///
/// Ordered collections keep set semantics on members: adding a member that is
/// already present only updates its score. Members with equal scores are
/// ordered by insertion, ascending ranges return oldest first and descending
/// ranges are the exact reverse. Expired keys behave as if they were absent.
#[async_trait]
pub trait OrderedStore: Send + Sync {
    async fn add_to_ordered_collection(&self, key: &str, score: f64, member: &str)
    -> StoreResult<()>;

    /// Members with `min <= score <= max`, highest score first
    async fn range_by_score_descending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>>;

    /// Members with `min <= score <= max`, lowest score first
    async fn range_by_score_ascending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a scalar value. Any expiry previously set on the key is cleared.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Expire `key` after `seconds`. Missing keys are left untouched.
    async fn set_expiry(&self, key: &str, seconds: u64) -> StoreResult<()>;

    /// Drop every key whose expiry has passed, returning how many were removed
    async fn purge_expired(&self) -> StoreResult<usize> {
        Ok(0)
    }
}
