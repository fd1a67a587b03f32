use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::debug;

use crate::entities::{ordered_members, prelude::*, store_keys};
use guess_core::{OrderedStore, ScoredMember, StoreError, StoreResult};

/// [`OrderedStore`] persisted in a SQL database through sea-orm
pub struct SqlOrderedStore {
    db: DatabaseConnection,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Sort database failures into retryable connection problems and everything else
fn classify(err: DbErr) -> StoreError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreError::Connection(err.to_string()),
        other => {
            let message = other.to_string();
            let lowered = message.to_lowercase();
            // SQLITE_BUSY and SQLITE_LOCKED
            if lowered.contains("database is locked")
                || lowered.contains("database table is locked")
            {
                StoreError::Connection(message)
            } else {
                StoreError::Data(message)
            }
        }
    }
}

fn wrong_type(key: &str, expected: &str) -> DbErr {
    DbErr::Custom(format!("key {key} does not hold {expected}"))
}

async fn delete_key<C: ConnectionTrait>(db: &C, key: &str) -> Result<(), DbErr> {
    OrderedMembers::delete_many()
        .filter(ordered_members::Column::Key.eq(key))
        .exec(db)
        .await?;
    StoreKeys::delete_by_id(key.to_string()).exec(db).await?;
    Ok(())
}

/// The key's row if it exists and has not expired. Expired keys are removed on the way.
async fn live_key<C: ConnectionTrait>(
    db: &C,
    key: &str,
    now: i64,
) -> Result<Option<store_keys::Model>, DbErr> {
    match StoreKeys::find_by_id(key.to_string()).one(db).await? {
        Some(row) if row.is_expired(now) => {
            delete_key(db, key).await?;
            Ok(None)
        }
        row => Ok(row),
    }
}

impl SqlOrderedStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn add(&self, key: &str, score: f64, member: &str) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;

        match live_key(&txn, key, now_millis()).await? {
            Some(row) if !row.is_collection() => return Err(wrong_type(key, "an ordered collection")),
            Some(_) => {}
            None => {
                let row = store_keys::ActiveModel {
                    key: ActiveValue::Set(key.to_string()),
                    value: ActiveValue::Set(None),
                    expires_at: ActiveValue::Set(None),
                };
                StoreKeys::insert(row).exec_without_returning(&txn).await?;
            }
        }

        let entry = ordered_members::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            member: ActiveValue::Set(member.to_string()),
            score: ActiveValue::Set(score),
            ..Default::default()
        };
        OrderedMembers::insert(entry)
            .on_conflict(
                OnConflict::columns([ordered_members::Column::Key, ordered_members::Column::Member])
                    .update_column(ordered_members::Column::Score)
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await
    }

    async fn range(
        &self,
        key: &str,
        min: f64,
        max: f64,
        descending: bool,
    ) -> Result<Vec<ScoredMember>, DbErr> {
        match live_key(&self.db, key, now_millis()).await? {
            None => return Ok(Vec::new()),
            Some(row) if !row.is_collection() => return Err(wrong_type(key, "an ordered collection")),
            Some(_) => {}
        }

        let query = OrderedMembers::find()
            .filter(ordered_members::Column::Key.eq(key))
            .filter(ordered_members::Column::Score.between(min, max));

        let rows = if descending {
            query
                .order_by_desc(ordered_members::Column::Score)
                .order_by_desc(ordered_members::Column::Id)
                .all(&self.db)
                .await?
        } else {
            query
                .order_by_asc(ordered_members::Column::Score)
                .order_by_asc(ordered_members::Column::Id)
                .all(&self.db)
                .await?
        };

        Ok(rows
            .into_iter()
            .map(|row| ScoredMember {
                member: row.member,
                score: row.score,
            })
            .collect())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, DbErr> {
        match live_key(&self.db, key, now_millis()).await? {
            None => Ok(None),
            Some(row) => match row.value {
                Some(value) => Ok(Some(value)),
                None => Err(wrong_type(key, "a scalar value")),
            },
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;

        // Overwriting replaces whatever the key held before, including its expiry
        OrderedMembers::delete_many()
            .filter(ordered_members::Column::Key.eq(key))
            .exec(&txn)
            .await?;

        let row = store_keys::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(Some(value.to_string())),
            expires_at: ActiveValue::Set(None),
        };
        StoreKeys::insert(row)
            .on_conflict(
                OnConflict::column(store_keys::Column::Key)
                    .update_columns([store_keys::Column::Value, store_keys::Column::ExpiresAt])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), DbErr> {
        let now = now_millis();
        if live_key(&self.db, key, now).await?.is_none() {
            return Ok(());
        }

        let ttl_ms = i64::try_from(seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        StoreKeys::update_many()
            .col_expr(
                store_keys::Column::ExpiresAt,
                Expr::value(now.saturating_add(ttl_ms)),
            )
            .filter(store_keys::Column::Key.eq(key))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn purge(&self) -> Result<usize, DbErr> {
        let expired: Vec<String> = StoreKeys::find()
            .filter(store_keys::Column::ExpiresAt.lte(now_millis()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.key)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        OrderedMembers::delete_many()
            .filter(ordered_members::Column::Key.is_in(expired.clone()))
            .exec(&txn)
            .await?;
        StoreKeys::delete_many()
            .filter(store_keys::Column::Key.is_in(expired.clone()))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        debug!("Purged {} expired keys from database", expired.len());
        Ok(expired.len())
    }
}

#[async_trait]
impl OrderedStore for SqlOrderedStore {
    async fn add_to_ordered_collection(
        &self,
        key: &str,
        score: f64,
        member: &str,
    ) -> StoreResult<()> {
        if score.is_nan() {
            return Err(StoreError::Data("score must be a number".to_string()));
        }
        self.add(key, score, member).await.map_err(classify)
    }

    async fn range_by_score_descending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.range(key, min, max, true).await.map_err(classify)
    }

    async fn range_by_score_ascending(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.range(key, min, max, false).await.map_err(classify)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.get_value(key).await.map_err(classify)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_value(key, value).await.map_err(classify)
    }

    async fn set_expiry(&self, key: &str, seconds: u64) -> StoreResult<()> {
        self.expire(key, seconds).await.map_err(classify)
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        self.purge().await.map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_store() -> SqlOrderedStore {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SqlOrderedStore::new(db)
    }

    fn members(scored: &[ScoredMember]) -> Vec<&str> {
        scored.iter().map(|m| m.member.as_str()).collect()
    }

    #[test]
    fn test_only_lock_contention_is_retryable() {
        let locked = classify(DbErr::Custom("database is locked".to_string()));
        assert!(matches!(locked, StoreError::Connection(_)));

        let table_locked = classify(DbErr::Custom("database table is locked: store_keys".to_string()));
        assert!(matches!(table_locked, StoreError::Connection(_)));

        let unrelated = classify(wrong_type("game:busy:stats", "a scalar value"));
        assert!(matches!(unrelated, StoreError::Data(_)));

        let busy_text = classify(DbErr::Custom("member is busy being parsed".to_string()));
        assert!(matches!(busy_text, StoreError::Data(_)));
    }

    #[tokio::test]
    async fn test_ordered_ranges() {
        let store = setup_test_store().await;
        store.add_to_ordered_collection("k", 30.0, "c").await.unwrap();
        store.add_to_ordered_collection("k", 10.0, "a").await.unwrap();
        store.add_to_ordered_collection("k", 20.0, "b").await.unwrap();

        let desc = store
            .range_by_score_descending("k", f64::MIN, f64::MAX)
            .await
            .unwrap();
        assert_eq!(members(&desc), vec!["c", "b", "a"]);
        assert_eq!(desc[0].score, 30.0);

        let asc = store.range_by_score_ascending("k", 15.0, 30.0).await.unwrap();
        assert_eq!(members(&asc), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_ties_follow_insertion_order() {
        let store = setup_test_store().await;
        store.add_to_ordered_collection("k", 5.0, "first").await.unwrap();
        store.add_to_ordered_collection("k", 5.0, "second").await.unwrap();

        let asc = store.range_by_score_ascending("k", 0.0, 10.0).await.unwrap();
        assert_eq!(members(&asc), vec!["first", "second"]);

        let desc = store.range_by_score_descending("k", 0.0, 10.0).await.unwrap();
        assert_eq!(members(&desc), vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_readding_member_is_idempotent() {
        let store = setup_test_store().await;
        store.add_to_ordered_collection("k", 1.0, "a").await.unwrap();
        store.add_to_ordered_collection("k", 1.0, "a").await.unwrap();

        let all = store.range_by_score_ascending("k", 0.0, 10.0).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_scalar_values() {
        let store = setup_test_store().await;
        assert_eq!(store.get("stats").await.unwrap(), None);

        store.set("stats", "one").await.unwrap();
        store.set("stats", "two").await.unwrap();
        assert_eq!(store.get("stats").await.unwrap(), Some("two".to_string()));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_data_error() {
        let store = setup_test_store().await;
        store.set("scalar", "1").await.unwrap();
        store.add_to_ordered_collection("ordered", 1.0, "a").await.unwrap();

        assert!(matches!(
            store.add_to_ordered_collection("scalar", 1.0, "a").await,
            Err(StoreError::Data(_))
        ));
        assert!(matches!(store.get("ordered").await, Err(StoreError::Data(_))));
    }

    #[tokio::test]
    async fn test_expired_keys_read_as_absent() {
        let store = setup_test_store().await;
        store.set("stats", "{}").await.unwrap();
        store.add_to_ordered_collection("guesses", 1.0, "a").await.unwrap();
        store.set("keep", "{}").await.unwrap();

        store.set_expiry("stats", 0).await.unwrap();
        store.set_expiry("guesses", 0).await.unwrap();
        store.set_expiry("keep", 3600).await.unwrap();
        store.set_expiry("missing", 0).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 2);
        assert_eq!(store.get("stats").await.unwrap(), None);
        assert!(store
            .range_by_score_ascending("guesses", 0.0, 10.0)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.get("keep").await.unwrap(), Some("{}".to_string()));
    }

    #[tokio::test]
    async fn test_expired_collection_starts_fresh() {
        let store = setup_test_store().await;
        store.add_to_ordered_collection("guesses", 1.0, "old").await.unwrap();
        store.set_expiry("guesses", 0).await.unwrap();

        store.add_to_ordered_collection("guesses", 2.0, "new").await.unwrap();
        let all = store.range_by_score_ascending("guesses", 0.0, 10.0).await.unwrap();
        assert_eq!(members(&all), vec!["new"]);
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            classify(DbErr::Custom("nope".to_string())),
            StoreError::Data(_)
        ));
        assert!(matches!(
            classify(DbErr::Custom("database is locked".to_string())),
            StoreError::Connection(_)
        ));
    }
}
