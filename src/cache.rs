//! Cache Layer: a short-TTL, best-effort cache for hot feed pools, keyed
//! `today_pool:<user>` / `week_pool:<user>`. Every operation degrades to a
//! miss rather than surfacing an error. Implemented with `retainer`
//! in-process rather than standing up Redis for what is an optional
//! optimization.

use std::sync::Arc;
use std::time::Duration;

use retainer::Cache as RetainerCache;
use uuid::Uuid;

/// Wraps an in-process TTL cache. All operations are infallible: a cache
/// that fails to produce a value is simply a miss, never an error.
pub struct Cache {
    inner: Arc<RetainerCache<String, Vec<Uuid>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RetainerCache::new()) }
    }

    /// Spawn the background eviction monitor. Must be called once per
    /// process; the returned handle can be dropped (the task keeps running
    /// for the life of the cache's `Arc`).
    pub fn spawn_monitor(&self) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(&self.inner);
        tokio::spawn(async move {
            cache.monitor(4, 0.25, Duration::from_secs(30)).await;
        })
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Uuid>> {
        self.inner.get(&key.to_string()).await.map(|guard| guard.value().clone())
    }

    pub async fn set(&self, key: &str, value: Vec<Uuid>, ttl: Duration) {
        self.inner.insert(key.to_string(), value, ttl).await;
    }

    /// Invalidate both hot pools for a user. Called after every feedback
    /// event so a like/dislike/bookmark is reflected on the next read.
    pub async fn invalidate_user_feed(&self, user_id: &str) {
        self.inner.remove(&format!("today_pool:{user_id}")).await;
        self.inner.remove(&format!("week_pool:{user_id}")).await;
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = Cache::new();
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        cache.set("today_pool:u1", ids.clone(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("today_pool:u1").await, Some(ids));
    }

    #[tokio::test]
    async fn missing_key_is_a_miss_not_an_error() {
        let cache = Cache::new();
        assert_eq!(cache.get("nope").await, None);
    }

    #[tokio::test]
    async fn invalidate_clears_both_user_keys() {
        let cache = Cache::new();
        cache.set("today_pool:u1", vec![Uuid::new_v4()], Duration::from_secs(60)).await;
        cache.set("week_pool:u1", vec![Uuid::new_v4()], Duration::from_secs(60)).await;
        cache.invalidate_user_feed("u1").await;
        assert_eq!(cache.get("today_pool:u1").await, None);
        assert_eq!(cache.get("week_pool:u1").await, None);
    }
}
