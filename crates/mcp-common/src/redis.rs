/// Redis cache wrapper with graceful degradation.
///
/// On any Redis error an operation logs a warning and reports a miss or a
/// failed write. Callers fall through to the source of truth; the system is
/// fully functional without Redis.
use redis::AsyncCommands;
use tracing::warn;

use crate::error::CommonError;

pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// If the URL is `None` or invalid, returns a cache that always misses.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, cache disabled"))
                .ok()
        });
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    /// Sends a PING. Returns `true` if Redis is reachable.
    pub async fn is_available(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    /// Returns `None` if Redis is unavailable or the key doesn't exist.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self
            .connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()?;
        conn.get::<_, Option<String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()?
    }

    /// Returns `true` if the value was stored.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Ok(mut conn) = self
            .connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
        else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    /// Deletes all keys under `{prefix}*` using SCAN (not KEYS, which blocks).
    pub async fn delete_by_prefix(&self, prefix: &str) -> bool {
        let Ok(mut conn) = self
            .connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
        else {
            return false;
        };

        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, "redis batch DEL failed during prefix delete");
                    return false;
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        true
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisUnavailable)?;
        Ok(client.get_multiplexed_async_connection().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_degrades() {
        let cache = RedisCache::new(None);
        assert!(!cache.is_available().await);
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.set_with_ttl("k", "v", 10).await);
        assert!(!RedisCache::disabled().delete_by_prefix("p:").await);
    }
}
