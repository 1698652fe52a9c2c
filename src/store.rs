//! Durable system of record the cache is warmed from and writes are mirrored to.

use crate::error::{LeaderboardError, LeaderboardResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub score: i64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;

    /// Persists a new user and returns it with its assigned id.
    async fn create(&self, username: &str, score: i64) -> LeaderboardResult<UserRecord>;

    /// Sets the score of an existing user and returns the record as stored
    /// after the update. Fails with `NotFound` if the id is unknown.
    async fn update_score(&self, id: &str, score: i64) -> LeaderboardResult<UserRecord>;

    /// Every record, in no particular order.
    async fn scan(&self) -> LeaderboardResult<Vec<UserRecord>>;

    async fn count(&self) -> LeaderboardResult<usize>;

    async fn insert_many(&self, users: Vec<(String, i64)>) -> LeaderboardResult<usize> {
        let mut inserted = 0;
        for (username, score) in users {
            self.create(&username, score).await?;
            inserted += 1;
        }
        Ok(inserted)
    }
}

/// Record store kept in process memory.
///
/// Stands in for a database in the binary and in tests; records are lost
/// when the process exits.
pub struct MemoryStore {
    name: String,
    records: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            name: "memory".to_string(),
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> MemoryStore {
        MemoryStore {
            name: "memory".to_string(),
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|record| (record.id.clone(), record))
                    .collect(),
            ),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, username: &str, score: i64) -> LeaderboardResult<UserRecord> {
        let record = UserRecord {
            id: Uuid::new_v4().simple().to_string(),
            username: username.to_string(),
            score,
        };
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_score(&self, id: &str, score: i64) -> LeaderboardResult<UserRecord> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(record) => {
                record.score = score;
                Ok(record.clone())
            }
            None => Err(LeaderboardError::NotFound(format!("user {id}"))),
        }
    }

    async fn scan(&self) -> LeaderboardResult<Vec<UserRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn count(&self) -> LeaderboardResult<usize> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_unique_ids() {
        let store = MemoryStore::new();
        let a = store.create("Alice", 100).await.unwrap();
        let b = store.create("Alice", 100).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_returns_the_stored_record() {
        let store = MemoryStore::new();
        let created = store.create("Bob", 100).await.unwrap();

        let updated = store.update_score(&created.id, 4200).await.unwrap();
        assert_eq!(updated.username, "Bob");
        assert_eq!(updated.score, 4200);
        assert_eq!(store.scan().await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_score("nope", 1).await.unwrap_err();
        assert!(matches!(err, LeaderboardError::NotFound(_)));
    }

    #[tokio::test]
    async fn insert_many_uses_create_for_every_user() {
        let store = MemoryStore::with_records([UserRecord {
            id: "seeded".to_string(),
            username: "Seed".to_string(),
            score: 1,
        }]);
        let inserted = store
            .insert_many(vec![("x".to_string(), 1), ("y".to_string(), 2)])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count().await.unwrap(), 3);
    }
}
