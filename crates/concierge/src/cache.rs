/// Redis caching layer for catalog snapshots.
///
/// Key schema:
/// - `concierge:v1:snapshot:{sha256(limits)}`: JSON-serialized CatalogSnapshot (short TTL)
///
/// A miss or a Redis outage falls through to the catalog source.
use grounding::CatalogSnapshot;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::catalog::SnapshotLimits;
use mcp_common::redis::RedisCache;

const KEY_PREFIX: &str = "concierge:v1:";

pub struct SnapshotCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl SnapshotCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub fn disabled() -> Self {
        Self::new(RedisCache::disabled(), 0)
    }

    pub async fn get_snapshot(&self, limits: &SnapshotLimits) -> Option<CatalogSnapshot> {
        if self.ttl_secs == 0 {
            return None;
        }
        let key = snapshot_key(limits);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_snapshot(&self, limits: &SnapshotLimits, snapshot: &CatalogSnapshot) {
        if self.ttl_secs == 0 {
            return;
        }
        let key = snapshot_key(limits);
        if let Ok(json) = serde_json::to_string(snapshot) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }

    pub async fn invalidate_all(&self) -> bool {
        self.redis
            .delete_by_prefix(&format!("{KEY_PREFIX}snapshot:"))
            .await
    }
}

fn snapshot_key(limits: &SnapshotLimits) -> String {
    let mut hasher = Sha256::new();
    hasher.update(limits.restaurants.to_le_bytes());
    hasher.update(limits.dishes.to_le_bytes());
    hasher.update(limits.order_history.to_le_bytes());
    if let Some(user_id) = &limits.user_id {
        hasher.update(b"user:");
        hasher.update(user_id.as_bytes());
    }
    let hash = hasher.finalize();
    let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
    format!("{KEY_PREFIX}snapshot:{hex}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(user_id: Option<&str>) -> SnapshotLimits {
        SnapshotLimits {
            restaurants: 30,
            dishes: 120,
            order_history: 5,
            user_id: user_id.map(str::to_string),
        }
    }

    #[test]
    fn test_snapshot_key_deterministic() {
        let k1 = snapshot_key(&limits(Some("u1")));
        let k2 = snapshot_key(&limits(Some("u1")));
        assert_eq!(k1, k2);
        assert!(k1.starts_with("concierge:v1:snapshot:"));
        assert_eq!(k1.len(), "concierge:v1:snapshot:".len() + 64);
    }

    #[test]
    fn test_snapshot_key_varies_by_user_and_limits() {
        let anonymous = snapshot_key(&limits(None));
        assert_ne!(anonymous, snapshot_key(&limits(Some("u1"))));
        assert_ne!(snapshot_key(&limits(Some("u1"))), snapshot_key(&limits(Some("u2"))));

        let smaller = SnapshotLimits {
            dishes: 10,
            ..limits(None)
        };
        assert_ne!(anonymous, snapshot_key(&smaller));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = SnapshotCache::disabled();
        cache.set_snapshot(&limits(None), &CatalogSnapshot::default()).await;
        assert!(cache.get_snapshot(&limits(None)).await.is_none());
        assert!(!cache.invalidate_all().await);
    }
}
