//! crema-core: provider, codec and metrics contracts consumed by `crema`.
//!
//! This crate carries no cache logic of its own — it defines the interfaces
//! `crema`'s facade and singleflight loader are generic over, plus a handful
//! of reference implementations (JSON/MessagePack/bincode codecs, a no-op
//! and a `metrics`/`tracing` metrics adapter).

mod codec;
mod compression;
mod error;
mod metrics;
mod object;
mod provider;

pub use codec::NoopCodec;
pub use compression::{CompressedCodec, Compressor, NoopCompressor};
pub use error::{CacheError, LoadError, Result};
pub use metrics::{MetricsProvider, NoopMetricsProvider};
pub use object::CacheObject;
pub use provider::CacheProvider;
pub use codec::SerializationCodec;

#[cfg(feature = "json")]
pub use codec::JsonCodec;

#[cfg(feature = "msgpack")]
pub use codec::MsgPackCodec;

#[cfg(feature = "bincode")]
pub use codec::BincodeCodec;

#[cfg(feature = "compression")]
pub use compression::ZstdCompressor;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateProvider;

#[cfg(feature = "tracing")]
pub use metrics::TracingMetricsProvider;
