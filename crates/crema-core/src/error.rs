//! Error types for cache operations

use thiserror::Error;

/// Error returned by a [`crate::CacheProvider`] or [`crate::SerializationCodec`],
/// and by the plain `get`/`set`/`delete` operations built on top of them.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The codec failed to encode a value before handing it to the provider.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The codec failed to decode a value read back from the provider.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The backend failed to connect to its underlying store.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected a get/set/delete call.
    #[error("backend error: {0}")]
    Backend(String),

    /// A compression codec failed to compress a value.
    #[error("compression error: {0}")]
    Compression(String),

    /// A compression codec failed to decompress a value.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Something went wrong inside the core that is not attributable to a
    /// provider or codec.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error returned by `Cache::get_or_load`.
///
/// Generic over the loader's own error type so a loader's domain error
/// survives verbatim to the caller, instead of being folded into
/// [`CacheError`].
#[derive(Error, Debug, Clone)]
pub enum LoadError<E> {
    /// The caller's own cancellation token fired before the shared load
    /// completed. The shared load itself is not aborted; this caller is
    /// simply detached from it.
    #[error("cancelled")]
    Cancelled,

    /// The loader callback returned an error. Propagated verbatim; no write
    /// to the backend occurs.
    #[error(transparent)]
    Loader(#[from] E),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::Serialization("failed".to_string());
        assert_eq!(err.to_string(), "serialization error: failed");

        let err = CacheError::Backend("boom".to_string());
        assert_eq!(err.to_string(), "backend error: boom");
    }

    #[test]
    fn test_error_clone() {
        let err = CacheError::Internal("x".to_string());
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_load_error_cancelled_display() {
        let err: LoadError<CacheError> = LoadError::Cancelled;
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn test_load_error_wraps_loader_error() {
        let err: LoadError<CacheError> = CacheError::Internal("nope".into()).into();
        assert!(matches!(err, LoadError::Loader(CacheError::Internal(_))));
    }
}
