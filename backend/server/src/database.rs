//! # Activity Store
//!
//! Document storage for winter activities.
//!
//! ## Redis
//!
//! - One hash, `activities`: field is the activity id, value is the JSON document
//! - O(1) lookups, updates and deletes by id
//! - Updates are a compare-and-set Lua script retried on conflict, deletes read and remove in one
//!   script, so a concurrent delete is never undone and concurrent partial updates both land
//! - Listing and filtering read every value then filter in process, fine for a catalog this size
//! - Hash order is arbitrary, so listings are sorted by `createdAt` then id to keep insertion
//!   order, batch inserts stamp each document a microsecond apart for the same reason
//!
//! ## Memory
//!
//! - Plain vector behind an async `RwLock`, insertion ordered
//! - Used by tests and by `STORE=memory` for running without Redis
use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use catalog::{
    activities::{Activity, ActivityChanges, Filter, NewActivity},
    initial_activities,
};
use chrono::{DateTime, Utc};
use redis::{
    AsyncCommands, Client, RedisError, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{Config, StoreKind};

pub const ACTIVITIES_KEY: &str = "activities";

const MAX_UPDATE_ATTEMPTS: usize = 8;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Redis(#[from] RedisError),

    #[error("Corrupt document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Activity {0} kept changing, update abandoned")]
    Contention(String),
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert(&self, new: NewActivity) -> Result<Activity, StoreError>;

    async fn insert_many(&self, new: Vec<NewActivity>) -> Result<Vec<Activity>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Activity>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Activity>, StoreError>;

    async fn find_by(&self, filter: Filter) -> Result<Vec<Activity>, StoreError> {
        let mut activities = self.find_all().await?;
        activities.retain(|activity| filter.matches(activity));

        Ok(activities)
    }

    /// Returns the activity after the changes, `None` when the id is unknown.
    async fn update(
        &self,
        id: &str,
        changes: ActivityChanges,
    ) -> Result<Option<Activity>, StoreError>;

    /// Returns the removed activity, `None` when the id is unknown.
    async fn delete(&self, id: &str) -> Result<Option<Activity>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

pub async fn init_store(config: &Config) -> Result<Arc<dyn ActivityStore>, StoreError> {
    let store: Arc<dyn ActivityStore> = match config.store {
        StoreKind::Redis => Arc::new(RedisStore::new(init_redis(&config.redis_url).await?)),
        StoreKind::Memory => {
            info!("Using in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::default())
        }
    };

    Ok(store)
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to Redis");

    Ok(connection_manager)
}

/// Loads the starter catalog into an empty store, returns how many were inserted.
pub async fn seed(store: &dyn ActivityStore) -> Result<usize, StoreError> {
    let existing = store.count().await?;
    if existing > 0 {
        info!("Store already holds {existing} activities, skipping seed");
        return Ok(0);
    }

    let inserted = store.insert_many(initial_activities()).await?.len();
    info!("Database seeded with {inserted} initial activities");

    Ok(inserted)
}

/// Writes the new document only if the stored one is still the document the caller read.
const COMPARE_AND_SET: &str = r#"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
    return 1
end
return 0
"#;

const TAKE: &str = r#"
local document = redis.call('HGET', KEYS[1], ARGV[1])
if document then
    redis.call('HDEL', KEYS[1], ARGV[1])
end
return document
"#;

pub struct RedisStore {
    connection: ConnectionManager,
    compare_and_set: Script,
    take: Script,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            compare_and_set: Script::new(COMPARE_AND_SET),
            take: Script::new(TAKE),
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hget(ACTIVITIES_KEY, id).await?)
    }
}

#[async_trait]
impl ActivityStore for RedisStore {
    async fn insert(&self, new: NewActivity) -> Result<Activity, StoreError> {
        let activity = Activity::create(new, Utc::now());
        let document = encode(&activity)?;

        let mut connection = self.connection.clone();
        let _: () = connection
            .hset(ACTIVITIES_KEY, &activity.id, document)
            .await?;

        debug!("Inserted activity {}", activity.id);
        Ok(activity)
    }

    async fn insert_many(&self, new: Vec<NewActivity>) -> Result<Vec<Activity>, StoreError> {
        if new.is_empty() {
            return Ok(Vec::new());
        }

        let activities = Activity::create_batch(new, Utc::now());

        let documents = activities
            .iter()
            .map(|activity| Ok((activity.id.as_str(), encode(activity)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;

        let mut connection = self.connection.clone();
        let _: () = connection
            .hset_multiple(ACTIVITIES_KEY, documents.as_slice())
            .await?;

        Ok(activities)
    }

    async fn find_all(&self) -> Result<Vec<Activity>, StoreError> {
        let mut connection = self.connection.clone();
        let documents: HashMap<String, String> = connection.hgetall(ACTIVITIES_KEY).await?;

        decode_all(documents.values().map(String::as_str))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Activity>, StoreError> {
        self.fetch(id)
            .await?
            .map(|document| decode(&document))
            .transpose()
    }

    async fn update(
        &self,
        id: &str,
        changes: ActivityChanges,
    ) -> Result<Option<Activity>, StoreError> {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let Some(current) = self.fetch(id).await? else {
                return Ok(None);
            };
            let (activity, document) = merge(&current, changes.clone(), Utc::now())?;

            let mut connection = self.connection.clone();
            let written: i64 = self
                .compare_and_set
                .key(ACTIVITIES_KEY)
                .arg(id)
                .arg(&current)
                .arg(&document)
                .invoke_async(&mut connection)
                .await?;

            if written == 1 {
                return Ok(Some(activity));
            }

            debug!("Activity {id} changed during update, retrying");
        }

        Err(StoreError::Contention(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<Option<Activity>, StoreError> {
        let mut connection = self.connection.clone();
        let document: Option<String> = self
            .take
            .key(ACTIVITIES_KEY)
            .arg(id)
            .invoke_async(&mut connection)
            .await?;

        document.map(|document| decode(&document)).transpose()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hlen(ACTIVITIES_KEY).await?)
    }
}

fn encode(activity: &Activity) -> Result<String, StoreError> {
    Ok(serde_json::to_string(activity)?)
}

fn decode(document: &str) -> Result<Activity, StoreError> {
    Ok(serde_json::from_str(document)?)
}

fn decode_all<'a>(
    documents: impl Iterator<Item = &'a str>,
) -> Result<Vec<Activity>, StoreError> {
    let mut activities = documents.map(decode).collect::<Result<Vec<_>, _>>()?;
    sort_by_insertion(&mut activities);

    Ok(activities)
}

/// Applies `changes` to a stored document, returning the result and its new document.
fn merge(
    document: &str,
    changes: ActivityChanges,
    now: DateTime<Utc>,
) -> Result<(Activity, String), StoreError> {
    let mut activity = decode(document)?;
    activity.apply(changes, now);
    let document = encode(&activity)?;

    Ok((activity, document))
}

fn sort_by_insertion(activities: &mut [Activity]) {
    activities.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[derive(Default)]
pub struct MemoryStore {
    activities: RwLock<Vec<Activity>>,
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert(&self, new: NewActivity) -> Result<Activity, StoreError> {
        let activity = Activity::create(new, Utc::now());
        self.activities.write().await.push(activity.clone());

        Ok(activity)
    }

    async fn insert_many(&self, new: Vec<NewActivity>) -> Result<Vec<Activity>, StoreError> {
        let inserted = Activity::create_batch(new, Utc::now());

        self.activities
            .write()
            .await
            .extend(inserted.iter().cloned());

        Ok(inserted)
    }

    async fn find_all(&self) -> Result<Vec<Activity>, StoreError> {
        Ok(self.activities.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Activity>, StoreError> {
        Ok(self
            .activities
            .read()
            .await
            .iter()
            .find(|activity| activity.id == id)
            .cloned())
    }

    async fn update(
        &self,
        id: &str,
        changes: ActivityChanges,
    ) -> Result<Option<Activity>, StoreError> {
        let mut activities = self.activities.write().await;

        Ok(activities
            .iter_mut()
            .find(|activity| activity.id == id)
            .map(|activity| {
                activity.apply(changes, Utc::now());
                activity.clone()
            }))
    }

    async fn delete(&self, id: &str) -> Result<Option<Activity>, StoreError> {
        let mut activities = self.activities.write().await;

        Ok(activities
            .iter()
            .position(|activity| activity.id == id)
            .map(|index| activities.remove(index)))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.activities.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use catalog::{
        activities::{Activity, ActivityChanges, Filter, NewActivity},
        initial_activities,
    };
    use chrono::{Duration, Utc};

    use super::{
        ActivityStore, MemoryStore, RedisStore, StoreError, decode, decode_all, encode,
        init_redis, merge, seed, sort_by_insertion,
    };

    fn new_activity(name: &str, price: f64, is_snow_needed: bool) -> NewActivity {
        NewActivity {
            name: name.to_string(),
            price,
            is_snow_needed,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::default();
        let skiing = store.insert(new_activity("Skiing", 75.0, true)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.find_by_id(&skiing.id).await.unwrap(), Some(skiing));
        assert_eq!(store.find_by_id("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_by_filter() {
        let store = MemoryStore::default();
        seed(&store).await.unwrap();

        let snowy = store.find_by(Filter::SnowNeeded(true)).await.unwrap();
        let dry = store.find_by(Filter::SnowNeeded(false)).await.unwrap();
        let free = store.find_by(Filter::Free).await.unwrap();

        assert_eq!(snowy.len(), 6);
        assert_eq!(dry.len(), 4);
        assert!(snowy.iter().all(|a| a.is_snow_needed));
        assert_eq!(
            free.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            ["Winter Hiking", "Snowman Building"]
        );
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryStore::default();
        let skating = store
            .insert(new_activity("Ice Skating", 15.0, false))
            .await
            .unwrap();

        let changes = ActivityChanges {
            price: Some(18.0),
            ..Default::default()
        };
        let updated = store.update(&skating.id, changes).await.unwrap().unwrap();

        assert_eq!(updated.name, "Ice Skating");
        assert_eq!(updated.price, 18.0);
        assert!(updated.updated_at >= skating.updated_at);
        assert_eq!(
            store
                .update("missing", ActivityChanges::default())
                .await
                .unwrap(),
            None
        );

        assert_eq!(store.delete(&skating.id).await.unwrap(), Some(updated));
        assert_eq!(store.delete(&skating.id).await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let store = MemoryStore::default();

        assert_eq!(seed(&store).await.unwrap(), 10);
        assert_eq!(seed(&store).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 10);

        let other = MemoryStore::default();
        other.insert(new_activity("Curling", 12.0, false)).await.unwrap();
        assert_eq!(seed(&other).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sort_by_insertion() {
        let store = MemoryStore::default();
        let mut activities = store
            .insert_many(vec![
                new_activity("Skiing", 75.0, true),
                new_activity("Sledding", 20.0, true),
            ])
            .await
            .unwrap();
        activities[0].created_at = Utc::now() + Duration::seconds(1);

        sort_by_insertion(&mut activities);

        assert_eq!(activities[0].name, "Sledding");
        assert_eq!(activities[1].name, "Skiing");
    }

    #[test]
    fn test_batch_order_survives_sort() {
        let seed_names: Vec<String> = initial_activities().into_iter().map(|a| a.name).collect();
        let mut batch = Activity::create_batch(initial_activities(), Utc::now());
        batch.reverse();

        let documents: Vec<String> = batch.iter().map(|a| encode(a).unwrap()).collect();
        let listed = decode_all(documents.iter().map(String::as_str)).unwrap();

        assert_eq!(
            listed.iter().map(|a| a.name.clone()).collect::<Vec<_>>(),
            seed_names
        );
    }

    #[test]
    fn test_document_round_trip() {
        let activity = Activity::create(new_activity("Dog Sledding", 150.0, true), Utc::now());
        let document = encode(&activity).unwrap();

        assert!(document.contains("\"isSnowNeeded\":true"));
        assert_eq!(decode(&document).unwrap(), activity);
        assert!(matches!(
            decode("{\"name\": \"Skiing\"}"),
            Err(StoreError::Serialization(_))
        ));
        assert!(decode_all(["not json"].into_iter()).is_err());
    }

    #[test]
    fn test_merge() {
        let activity = Activity::create(new_activity("Snowshoeing", 30.0, true), Utc::now());
        let later = activity.updated_at + Duration::seconds(3);

        let (merged, document) = merge(
            &encode(&activity).unwrap(),
            ActivityChanges {
                name: Some("Night Snowshoeing".to_string()),
                ..Default::default()
            },
            later,
        )
        .unwrap();

        assert_eq!(merged.name, "Night Snowshoeing");
        assert_eq!(merged.price, 30.0);
        assert_eq!(merged.id, activity.id);
        assert_eq!(merged.updated_at, later);
        assert_eq!(decode(&document).unwrap(), merged);

        assert!(merge("", ActivityChanges::default(), later).is_err());
    }

    /// Runs against `REDIS_TEST_URL` (local database 15 by default), wipes its `activities` hash.
    #[tokio::test]
    #[ignore = "needs a running Redis"]
    async fn test_redis_concurrent_writes() {
        let url = std::env::var("REDIS_TEST_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
        let connection = init_redis(&url).await.unwrap();
        let mut raw = connection.clone();
        let _: () = redis::AsyncCommands::del(&mut raw, super::ACTIVITIES_KEY)
            .await
            .unwrap();
        let store = RedisStore::new(connection);

        seed(&store).await.unwrap();
        let listed = store.find_all().await.unwrap();
        assert_eq!(
            listed.iter().map(|a| a.name.clone()).collect::<Vec<_>>(),
            initial_activities().into_iter().map(|a| a.name).collect::<Vec<_>>()
        );

        let skiing = &listed[0];
        let price = ActivityChanges {
            price: Some(60.0),
            ..Default::default()
        };
        let name = ActivityChanges {
            name: Some("Night Skiing".to_string()),
            ..Default::default()
        };
        let (a, b) = tokio::join!(store.update(&skiing.id, price), store.update(&skiing.id, name));
        assert!(a.unwrap().is_some() && b.unwrap().is_some());

        let both = store.find_by_id(&skiing.id).await.unwrap().unwrap();
        assert_eq!((both.name.as_str(), both.price), ("Night Skiing", 60.0));

        let sledding = &listed[3];
        let (updated, deleted) = tokio::join!(
            store.update(&sledding.id, ActivityChanges::default()),
            store.delete(&sledding.id)
        );
        assert!(deleted.unwrap().is_some());
        let _ = updated.unwrap();
        assert_eq!(store.find_by_id(&sledding.id).await.unwrap(), None);
        assert_eq!(store.delete(&sledding.id).await.unwrap(), None);
    }
}
