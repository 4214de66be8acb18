//! Optional compression wrapper around a byte-producing codec.

use crate::{CacheError, CacheObject, Result, SerializationCodec};

/// Compression level (1-22, higher = better compression but slower).
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Values smaller than this (in bytes) are not compressed.
pub const MIN_COMPRESSION_SIZE: usize = 256;

/// A byte compressor usable to wrap a [`SerializationCodec<V, Vec<u8>>`].
pub trait Compressor: Send + Sync + Clone + 'static {
    /// Compress `data`.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress `data`.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Whether `data` is worth compressing, based on a size threshold.
    fn should_compress(&self, data: &[u8]) -> bool {
        data.len() >= MIN_COMPRESSION_SIZE
    }
}

/// No-op compressor; disables compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn should_compress(&self, _data: &[u8]) -> bool {
        false
    }
}

/// Zstd compressor.
#[cfg(feature = "compression")]
#[derive(Debug, Clone)]
pub struct ZstdCompressor {
    level: i32,
    min_size: usize,
}

#[cfg(feature = "compression")]
impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

#[cfg(feature = "compression")]
impl ZstdCompressor {
    /// Create a compressor at the given level (clamped to 1..=22).
    pub fn new(level: i32) -> Self {
        Self {
            level: level.clamp(1, 22),
            min_size: MIN_COMPRESSION_SIZE,
        }
    }

    /// Override the minimum size threshold for compression.
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// The configured compression level.
    pub fn level(&self) -> i32 {
        self.level
    }
}

#[cfg(feature = "compression")]
impl Compressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(data, self.level).map_err(|e| CacheError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(data).map_err(|e| CacheError::Decompression(e.to_string()))
    }

    fn should_compress(&self, data: &[u8]) -> bool {
        data.len() >= self.min_size
    }
}

/// Wraps an inner byte codec with a compressor, compressing on encode and
/// decompressing on decode whenever the compressor opts in via
/// [`Compressor::should_compress`].
///
/// A one-byte flag is prepended so `decode` knows whether the payload was
/// actually compressed.
pub struct CompressedCodec<Codec, Comp> {
    inner: Codec,
    compressor: Comp,
}

impl<Codec, Comp> CompressedCodec<Codec, Comp> {
    /// Wrap `inner` so its output is compressed with `compressor`.
    pub fn new(inner: Codec, compressor: Comp) -> Self {
        Self { inner, compressor }
    }
}

const FLAG_COMPRESSED: u8 = 1;
const FLAG_RAW: u8 = 0;

impl<V, Codec, Comp> SerializationCodec<V, Vec<u8>> for CompressedCodec<Codec, Comp>
where
    V: Send + Sync + 'static,
    Codec: SerializationCodec<V, Vec<u8>>,
    Comp: Compressor,
{
    fn encode(&self, value: &CacheObject<V>) -> Result<Vec<u8>> {
        let raw = self.inner.encode(value)?;
        if self.compressor.should_compress(&raw) {
            let mut out = Vec::with_capacity(raw.len() + 1);
            out.push(FLAG_COMPRESSED);
            out.extend(self.compressor.compress(&raw)?);
            Ok(out)
        } else {
            let mut out = Vec::with_capacity(raw.len() + 1);
            out.push(FLAG_RAW);
            out.extend(raw);
            Ok(out)
        }
    }

    fn decode(&self, data: Vec<u8>) -> Result<CacheObject<V>> {
        let (flag, body) = data
            .split_first()
            .ok_or_else(|| CacheError::Deserialization("empty payload".into()))?;
        let raw = match *flag {
            FLAG_COMPRESSED => self.compressor.decompress(body)?,
            _ => body.to_vec(),
        };
        self.inner.decode(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_compressor_roundtrip() {
        let compressor = NoopCompressor;
        let data = b"hello world";
        let compressed = compressor.compress(data).unwrap();
        assert_eq!(compressed, data);
        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
        assert!(!compressor.should_compress(data));
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_zstd_compressor_roundtrip() {
        let compressor = ZstdCompressor::new(3);
        let data: Vec<u8> = (0..1024).map(|i| (i % 256) as u8).collect();
        let compressed = compressor.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_zstd_level_clamping() {
        assert_eq!(ZstdCompressor::new(-5).level(), 1);
        assert_eq!(ZstdCompressor::new(100).level(), 22);
    }

    #[cfg(all(feature = "json", feature = "compression"))]
    #[test]
    fn test_compressed_codec_roundtrip_small_and_large() {
        use crate::JsonCodec;

        let codec = CompressedCodec::new(JsonCodec, ZstdCompressor::new(3));

        let small = CacheObject::new(7i32, 1000);
        let encoded = codec.encode(&small).unwrap();
        let decoded: CacheObject<i32> = codec.decode(encoded).unwrap();
        assert_eq!(decoded, small);

        let large = CacheObject::new(vec![1u8; 4096], 2000);
        let encoded = codec.encode(&large).unwrap();
        let decoded: CacheObject<Vec<u8>> = codec.decode(encoded).unwrap();
        assert_eq!(decoded, large);
    }
}
