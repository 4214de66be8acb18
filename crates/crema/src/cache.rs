//! The cache facade: `Get`/`Set`/`Delete`/`GetOrLoad` over a pluggable
//! provider, codec and metrics sink.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crema_core::{
    CacheError, CacheObject, CacheProvider, LoadError, MetricsProvider, NoopMetricsProvider,
    Result, SerializationCodec,
};

use crate::loader::Loader;
use crate::revalidation::{self, RevalidationCurve};

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

/// Coordinates probabilistic revalidation with optional singleflight
/// loading over a pluggable storage provider `P` and codec `C`.
///
/// `E` is the error type `get_or_load`'s loader fails with; it is fixed per
/// `Cache` instance (defaulting to [`CacheError`]) because the singleflight
/// map backing coalescing is itself typed on it and must persist across
/// calls.
///
/// Constructed once via [`Cache::new`] and the builder methods, then used
/// immutably — there is no runtime reconfiguration.
pub struct Cache<V, S, P, C, M = NoopMetricsProvider, E = CacheError> {
    provider: P,
    codec: C,
    metrics: M,
    loader: Loader<V, E>,
    curve: RevalidationCurve,
    _marker: std::marker::PhantomData<fn() -> S>,
}

impl<V, S, P, C, E> Cache<V, S, P, C, NoopMetricsProvider, E>
where
    V: Clone + Send + Sync + 'static,
    P: CacheProvider<S>,
    C: SerializationCodec<V, S>,
    E: Clone + Send + Sync + 'static,
{
    /// Construct a cache with no metrics, singleflight loading, and the
    /// default revalidation window.
    pub fn new(provider: P, codec: C) -> Self {
        Self {
            provider,
            codec,
            metrics: NoopMetricsProvider,
            loader: Loader::singleflight(),
            curve: RevalidationCurve::default(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<V, S, P, C, M, E> Cache<V, S, P, C, M, E>
where
    V: Clone + Send + Sync + 'static,
    P: CacheProvider<S>,
    C: SerializationCodec<V, S>,
    M: MetricsProvider + Clone,
    E: Clone + Send + Sync + 'static,
{
    /// Replace the metrics provider.
    pub fn with_metrics<M2>(self, metrics: M2) -> Cache<V, S, P, C, M2, E>
    where
        M2: MetricsProvider + Clone,
    {
        Cache {
            provider: self.provider,
            codec: self.codec,
            metrics,
            loader: self.loader,
            curve: self.curve,
            _marker: std::marker::PhantomData,
        }
    }

    /// Disable singleflight coalescing; every `get_or_load` call runs its
    /// own loader invocation.
    pub fn with_direct_loader(mut self) -> Self {
        self.loader = Loader::direct();
        self
    }

    /// Override the target revalidation window. `Duration::ZERO` disables
    /// early revalidation entirely (only hard expiry triggers a reload).
    pub fn with_revalidation_window(mut self, window: Duration) -> Self {
        self.curve = RevalidationCurve::for_target_millis(window.as_millis() as i64);
        self
    }

    /// Returns the cached entry for `key`, if present.
    pub async fn get(&self, key: &str) -> Result<Option<CacheObject<V>>> {
        self.metrics.record_cache_get();

        let raw = match self.provider.get(key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let object = self.codec.decode(raw)?;
        self.metrics.record_cache_hit();
        Ok(Some(object))
    }

    /// Stores `object`, skipping the write if it is already expired.
    pub async fn set(&self, key: &str, object: CacheObject<V>) -> Result<()> {
        self.metrics.record_cache_set();

        let encoded = self.codec.encode(&object)?;
        let remaining = object.expire_at_millis - now_millis();
        if remaining <= 0 {
            return Ok(());
        }
        self.provider
            .set(key, encoded, Duration::from_millis(remaining as u64))
            .await
    }

    /// Removes the cached entry for `key`. Idempotent.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.metrics.record_cache_delete();
        self.provider.delete(key).await
    }

    /// Returns the cached value for `key`, or uses `loader` when missing or
    /// due for probabilistic revalidation.
    ///
    /// `cancel` is this caller's own cancellation token. If it fires before
    /// a shared load completes, this call returns `LoadError::Cancelled`
    /// without affecting the load itself — a concurrent call sharing the
    /// same in-flight load is unaffected, and the load keeps running for
    /// whichever callers remain.
    pub async fn get_or_load<F, Fut>(
        &self,
        cancel: CancellationToken,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> std::result::Result<V, LoadError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        let cached = match self.get(key).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to get from cache");
                None
            }
        };

        if let Some(object) = &cached {
            let draw = rand::random::<f64>();
            if !revalidation::should_revalidate(
                &self.curve,
                now_millis(),
                object.expire_at_millis,
                draw,
            ) {
                return Ok(object.value.clone());
            }
        }

        let (value, leader) = self.loader.load(key, cancel, loader, &self.metrics).await?;

        if leader {
            let object = CacheObject::new(value.clone(), now_millis() + ttl.as_millis() as i64);
            if let Err(err) = self.set(key, object).await {
                tracing::warn!(key, error = %err, "failed to set cache");
            }
        }
        Ok(value)
    }
}
