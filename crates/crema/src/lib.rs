//! crema: a generic, pluggable async caching core.
//!
//! # Features
//!
//! - Sharded singleflight loading — concurrent misses for the same key
//!   coalesce into one loader invocation
//! - Probabilistic early revalidation — avoids a thundering herd at hard
//!   expiry by spreading reloads across a window before it
//! - Pluggable storage (`CacheProvider`), serialization (`SerializationCodec`)
//!   and metrics (`MetricsProvider`) — no backend or wire format is baked in
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use crema::Cache;
//! use crema_core::JsonCodec;
//! use crema_storage::MemoryProvider;
//! use tokio_util::sync::CancellationToken;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Cache::new(MemoryProvider::new(), JsonCodec);
//!
//!     let value = cache
//!         .get_or_load(
//!             CancellationToken::new(),
//!             "user:1",
//!             Duration::from_secs(60),
//!             |_cancel| async { Ok::<_, std::convert::Infallible>(42i32) },
//!         )
//!         .await?;
//!     println!("{value}");
//!     Ok(())
//! }
//! ```

mod cache;
mod loader;
mod revalidation;

pub use cache::Cache;
pub use loader::{DirectLoader, Loader, SingleflightLoader};
pub use revalidation::{should_revalidate, RevalidationCurve, DEFAULT_REVALIDATION_WINDOW_MILLIS};

// Re-export the core contracts so downstream crates need only depend on
// `crema` for the common case.
pub use crema_core::{
    CacheError, CacheObject, CacheProvider, LoadError, MetricsProvider, NoopMetricsProvider,
    Result, SerializationCodec,
};

#[cfg(feature = "json")]
pub use crema_core::JsonCodec;

#[cfg(feature = "msgpack")]
pub use crema_core::MsgPackCodec;

#[cfg(feature = "bincode")]
pub use crema_core::BincodeCodec;

#[cfg(feature = "metrics")]
pub use crema_core::MetricsCrateProvider;

#[cfg(feature = "tracing")]
pub use crema_core::TracingMetricsProvider;

/// Convenient re-exports for the common case of a `Cache` backed by one of
/// `crema-storage`'s providers.
pub mod prelude {
    pub use crate::{Cache, CacheError, CacheObject, CacheProvider, LoadError, Result, SerializationCodec};

    #[cfg(feature = "memory")]
    pub use crema_storage::{MemoryConfig, MemoryProvider};

    #[cfg(feature = "redis")]
    pub use crema_storage::{RedisConfig, RedisProvider};

    #[cfg(feature = "json")]
    pub use crate::JsonCodec;

    #[cfg(feature = "msgpack")]
    pub use crate::MsgPackCodec;

    #[cfg(feature = "bincode")]
    pub use crate::BincodeCodec;
}
