//! Redis-backed [`CacheProvider`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;

use crema_core::{CacheError, CacheProvider, Result};

use super::config::RedisConfig;

/// Stores encoded values (`Vec<u8>`) in Redis through a `bb8` connection
/// pool.
///
/// `crema`'s facade handles encoding/decoding via a [`SerializationCodec`];
/// this provider only moves bytes.
///
/// [`SerializationCodec`]: crema_core::SerializationCodec
#[derive(Clone)]
pub struct RedisProvider {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
}

impl RedisProvider {
    /// Connect a pool according to `config`.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self { pool, config })
    }

    fn prefixed_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CacheProvider<Vec<u8>> for RedisProvider {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);
        conn.get(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);

        if ttl.is_zero() {
            conn.set(&prefixed, value)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))
        } else {
            let secs = ttl.as_secs().max(1);
            conn.set_ex(&prefixed, value, secs)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let prefixed = self.prefixed_key(key);
        let _: u64 = conn
            .del(&prefixed)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }
}
