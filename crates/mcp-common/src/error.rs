/// Error types shared across MCP server crates.
///
/// Only the Redis wrapper raises these, and it absorbs them into cache
/// misses before they reach a server crate.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis unavailable, degrading gracefully")]
    RedisUnavailable,
}
