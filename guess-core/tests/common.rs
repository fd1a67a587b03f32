#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use guess_core::{
    GuessService, InMemoryStore, LedgerConfig, OrderedStore, RetryPolicy, ScoredMember,
    StatsRefresh, StoreError, StoreResult,
};
use guess_types::{GuessSubmission, HidingSpot};

/// Store wrapper that counts calls and injects failures
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    calls: AtomicU32,
    connection_failures: AtomicU32,
    fail_sets: AtomicBool,
    fail_expiry: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls fail with a connection error
    pub fn fail_next(&self, count: u32) {
        self.connection_failures.store(count, Ordering::SeqCst);
    }

    /// Make every scalar write fail with a connection error
    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// Make every expiry update fail with a connection error
    pub fn fail_expiry(&self, fail: bool) {
        self.fail_expiry.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .connection_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        if injected {
            Err(StoreError::Connection("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderedStore for FlakyStore {
    async fn add_to_ordered_collection(
        &self,
        key: &str,
        score: f64,
        member: &str,
    ) -> StoreResult<()> {
        self.check()?;
        self.inner.add_to_ordered_collection(key, score, member).await
    }

    async fn range_by_score_descending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.check()?;
        self.inner.range_by_score_descending(key, min, max).await
    }

    async fn range_by_score_ascending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.check()?;
        self.inner.range_by_score_ascending(key, min, max).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check()?;
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("writes disabled".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn set_expiry(&self, key: &str, seconds: u64) -> StoreResult<()> {
        self.check()?;
        if self.fail_expiry.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("expiry updates disabled".to_string()));
        }
        self.inner.set_expiry(key, seconds).await
    }
}

pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        guess_ttl: Duration::from_secs(3600),
        retry: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
        stats_refresh: StatsRefresh::Inline,
    }
}

pub fn create_test_service() -> (GuessService, Arc<FlakyStore>) {
    let store = Arc::new(FlakyStore::new());
    let service = GuessService::new(store.clone(), test_config());
    (service, store)
}

pub fn pumpkin_spot() -> HidingSpot {
    HidingSpot {
        object_key: "pumpkin".to_string(),
        rel_x: 0.5,
        rel_y: 0.3,
    }
}

pub fn submission(user_id: &str, object_key: &str, rel_x: f64, rel_y: f64) -> GuessSubmission {
    GuessSubmission {
        user_id: user_id.to_string(),
        username: format!("{user_id}-name"),
        object_key: object_key.to_string(),
        rel_x,
        rel_y,
    }
}
