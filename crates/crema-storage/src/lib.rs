//! crema-storage: cache providers for `crema`.
//!
//! Ships an in-process [`MemoryProvider`] and, behind the `redis` feature, a
//! [`RedisProvider`] — both implementing [`crema_core::CacheProvider`].

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryConfig, MemoryProvider};

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisProvider};
