//! In-process memory provider backed by `DashMap`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crema_core::{CacheProvider, Result};
use dashmap::DashMap;

/// Configuration for [`MemoryProvider`].
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// TTL applied when a caller passes `Duration::ZERO` to `set`.
    ///
    /// `None` means such entries never expire on their own and live until
    /// explicitly deleted or overwritten.
    pub default_ttl: Option<Duration>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(Duration::from_secs(300)),
        }
    }
}

impl MemoryConfig {
    /// Use `ttl` whenever a caller omits one.
    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self {
            default_ttl: Some(ttl),
        }
    }

    /// Entries without an explicit TTL never expire.
    pub fn no_default_ttl() -> Self {
        Self { default_ttl: None }
    }
}

struct Slot<S> {
    value: S,
    expires_at: Option<Instant>,
}

impl<S> Slot<S> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// An in-memory [`CacheProvider`] storing entries in a sharded `DashMap`.
///
/// Expiration is lazy: an entry past its TTL is evicted the next time it is
/// looked up, not on a background timer. There is no cross-process
/// coordination; values live only in this process's memory.
#[derive(Clone)]
pub struct MemoryProvider<S> {
    entries: Arc<DashMap<String, Slot<S>>>,
    config: MemoryConfig,
}

impl<S> MemoryProvider<S> {
    /// Create a provider with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// Create a provider with an explicit configuration.
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Number of entries currently stored, including any not yet swept past
    /// their TTL.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the provider holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Default for MemoryProvider<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> CacheProvider<S> for MemoryProvider<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<S>> {
        let now = Instant::now();
        if let Some(slot) = self.entries.get(key) {
            if slot.is_expired(now) {
                drop(slot);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(slot.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: S, ttl: Duration) -> Result<()> {
        let effective_ttl = if ttl.is_zero() {
            self.config.default_ttl
        } else {
            Some(ttl)
        };
        let expires_at = effective_ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_string(),
            Slot {
                value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let provider = MemoryProvider::new();
        provider.set("k", 42, Duration::from_secs(60)).await.unwrap();
        assert_eq!(provider.get("k").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let provider: MemoryProvider<i32> = MemoryProvider::new();
        assert_eq!(provider.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let provider = MemoryProvider::new();
        provider.set("k", 1, Duration::from_secs(60)).await.unwrap();
        provider.delete("k").await.unwrap();
        provider.delete("k").await.unwrap();
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_evicted_on_get() {
        let provider = MemoryProvider::new();
        provider
            .set("k", 1, Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(provider.get("k").await.unwrap(), None);
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn test_zero_ttl_uses_config_default() {
        let provider = MemoryProvider::with_config(MemoryConfig::with_default_ttl(
            Duration::from_millis(10),
        ));
        provider.set("k", 1, Duration::ZERO).await.unwrap();
        assert_eq!(provider.get("k").await.unwrap(), Some(1));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_default_ttl_never_expires() {
        let provider =
            MemoryProvider::with_config(MemoryConfig::no_default_ttl());
        provider.set("k", 1, Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(provider.get("k").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_ttl() {
        let provider = MemoryProvider::new();
        provider.set("k", 1, Duration::from_millis(10)).await.unwrap();
        provider.set("k", 2, Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(provider.get("k").await.unwrap(), Some(2));
    }
}
