//! Storage backend contract.

use async_trait::async_trait;
use std::time::Duration;

use crate::Result;

/// Abstracts storage for encoded cache entries.
///
/// Implementations must be safe for concurrent use by multiple tasks. The
/// core ships no backend of its own; `crema-storage` provides a memory and a
/// Redis implementation of this trait.
#[async_trait]
pub trait CacheProvider<S>: Send + Sync + 'static {
    /// Retrieves a value from the backend by key.
    ///
    /// Returns `Ok(None)` for a missing key; never an error for a plain
    /// miss.
    async fn get(&self, key: &str) -> Result<Option<S>>;

    /// Stores a value in the backend with the specified key.
    ///
    /// `ttl` of zero means "no explicit TTL" — implementations may interpret
    /// that as a backend default.
    async fn set(&self, key: &str, value: S, ttl: Duration) -> Result<()>;

    /// Removes a value from the backend by key.
    ///
    /// Idempotent: deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
