use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{OrderedStore, ScoredMember, StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    // Kept sorted by (score, insertion sequence)
    Ordered(Vec<OrderedEntry>),
}

#[derive(Debug, Clone)]
struct OrderedEntry {
    member: String,
    score: f64,
    sequence: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<i64>, // epoch milliseconds
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_sequence: u64,
}

/// Process-local [`OrderedStore`], used when no database is configured and in tests
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Utc::now().timestamp_millis();
        let inner = self.inner.read().await;
        inner
            .entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn range(
        &self,
        key: &str,
        min: f64,
        max: f64,
        descending: bool,
    ) -> StoreResult<Vec<ScoredMember>> {
        let now = Utc::now().timestamp_millis();
        let inner = self.inner.read().await;

        let entries = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match &entry.value {
                Value::Ordered(entries) => entries,
                Value::Scalar(_) => {
                    return Err(StoreError::Data(format!(
                        "key {key} holds a scalar, not an ordered collection"
                    )));
                }
            },
            _ => return Ok(Vec::new()),
        };

        let selected = entries
            .iter()
            .filter(|entry| entry.score >= min && entry.score <= max)
            .map(|entry| ScoredMember {
                member: entry.member.clone(),
                score: entry.score,
            });

        Ok(if descending {
            selected.rev().collect()
        } else {
            selected.collect()
        })
    }
}

#[async_trait]
impl OrderedStore for InMemoryStore {
    async fn add_to_ordered_collection(
        &self,
        key: &str,
        score: f64,
        member: &str,
    ) -> StoreResult<()> {
        if score.is_nan() {
            return Err(StoreError::Data("score must be a number".to_string()));
        }

        let now = Utc::now().timestamp_millis();
        let mut inner = self.inner.write().await;
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        if inner.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            inner.entries.remove(key);
        }

        let entry = inner.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Ordered(Vec::new()),
            expires_at: None,
        });

        let Value::Ordered(entries) = &mut entry.value else {
            return Err(StoreError::Data(format!(
                "key {key} holds a scalar, not an ordered collection"
            )));
        };

        // Re-adding keeps the original insertion sequence
        let sequence = match entries.iter().position(|entry| entry.member == member) {
            Some(index) => entries.remove(index).sequence,
            None => sequence,
        };

        let position = entries.partition_point(|entry| {
            entry.score < score || (entry.score == score && entry.sequence < sequence)
        });
        entries.insert(
            position,
            OrderedEntry {
                member: member.to_string(),
                score,
                sequence,
            },
        );

        Ok(())
    }

    async fn range_by_score_descending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.range(key, min, max, true).await
    }

    async fn range_by_score_ascending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.range(key, min, max, false).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Utc::now().timestamp_millis();
        let inner = self.inner.read().await;

        match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match &entry.value {
                Value::Scalar(value) => Ok(Some(value.clone())),
                Value::Ordered(_) => Err(StoreError::Data(format!(
                    "key {key} holds an ordered collection, not a scalar"
                ))),
            },
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value.to_string()),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_expiry(&self, key: &str, seconds: u64) -> StoreResult<()> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        let mut inner = self.inner.write().await;

        if let Some(entry) = inner.entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.expires_at = Some(now.saturating_add(ttl_ms));
            }
        }
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now().timestamp_millis();
        let mut inner = self.inner.write().await;

        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - inner.entries.len();

        if purged > 0 {
            debug!("Purged {} expired keys from in-memory store", purged);
        }
        Ok(purged)
    }
}
