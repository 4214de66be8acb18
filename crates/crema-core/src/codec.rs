//! Pluggable encode/decode between `CacheObject<V>` and a backend's storage
//! representation `S`.

use serde::{de::DeserializeOwned, Serialize};

use crate::{CacheError, CacheObject, Result};

/// Encodes and decodes cache objects to a backend's storage representation.
///
/// Implementations must be safe for concurrent use by multiple tasks and
/// must round-trip: `decode(encode(x)) == x` for every `x` the codec claims
/// to support.
pub trait SerializationCodec<V, S>: Send + Sync + 'static {
    /// Encodes a cache object into its storage representation.
    fn encode(&self, value: &CacheObject<V>) -> Result<S>;

    /// Decodes a storage representation back into a cache object.
    fn decode(&self, data: S) -> Result<CacheObject<V>>;
}

/// Passes `CacheObject<V>` through without encoding; useful when the
/// backend stores Rust values directly (e.g. an in-process memory provider
/// with `S = CacheObject<V>`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCodec;

impl<V> SerializationCodec<V, CacheObject<V>> for NoopCodec
where
    V: Clone + Send + Sync + 'static,
{
    fn encode(&self, value: &CacheObject<V>) -> Result<CacheObject<V>> {
        Ok(value.clone())
    }

    fn decode(&self, data: CacheObject<V>) -> Result<CacheObject<V>> {
        Ok(data)
    }
}

/// Marshals cache objects as JSON bytes via `serde_json`.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl<V> SerializationCodec<V, Vec<u8>> for JsonCodec
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn encode(&self, value: &CacheObject<V>) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode(&self, data: Vec<u8>) -> Result<CacheObject<V>> {
        serde_json::from_slice(&data).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// Marshals cache objects as MessagePack bytes via `rmp-serde`.
///
/// Faster and more compact than JSON, at the cost of human readability.
#[cfg(feature = "msgpack")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

#[cfg(feature = "msgpack")]
impl<V> SerializationCodec<V, Vec<u8>> for MsgPackCodec
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn encode(&self, value: &CacheObject<V>) -> Result<Vec<u8>> {
        rmp_serde::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode(&self, data: Vec<u8>) -> Result<CacheObject<V>> {
        rmp_serde::from_slice(&data).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// Marshals cache objects via `bincode`.
///
/// Fastest and most compact of the built-in codecs; not cross-language.
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

#[cfg(feature = "bincode")]
impl<V> SerializationCodec<V, Vec<u8>> for BincodeCodec
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn encode(&self, value: &CacheObject<V>) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode(&self, data: Vec<u8>) -> Result<CacheObject<V>> {
        let (val, _len) = bincode::serde::decode_from_slice(&data, bincode::config::standard())
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(val)
    }
}
