//! The cached value/expiry pair stored above a [`crate::SerializationCodec`].

/// A cached value together with its absolute expiration time.
///
/// `expire_at_millis` is an absolute wall-clock instant in milliseconds since
/// the Unix epoch, not a duration. A [`crate::CacheProvider`] never persists
/// an object whose `expire_at_millis` has already passed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheObject<V> {
    /// The cached value.
    pub value: V,
    /// Absolute expiration time, in milliseconds since the Unix epoch.
    pub expire_at_millis: i64,
}

impl<V> CacheObject<V> {
    /// Construct a new cache object.
    pub fn new(value: V, expire_at_millis: i64) -> Self {
        Self {
            value,
            expire_at_millis,
        }
    }

    /// Whether this object is already expired as of `now_millis`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expire_at_millis <= now_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let obj = CacheObject::new(1, 1000);
        assert!(!obj.is_expired(500));
        assert!(obj.is_expired(1000));
        assert!(obj.is_expired(1500));
    }
}
