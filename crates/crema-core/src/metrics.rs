//! Metrics trait for cache and loader observability.

/// Receives cache and loader events for instrumentation.
///
/// Implementations must be non-blocking and safe for concurrent use. The
/// default is a no-op; `crema-core` also ships an adapter over the
/// `metrics` crate and one over `tracing`, both feature-gated.
pub trait MetricsProvider: Send + Sync + 'static {
    /// A cache lookup was attempted.
    fn record_cache_get(&self) {}
    /// A cached value was successfully returned.
    fn record_cache_hit(&self) {}
    /// A cache write was attempted.
    fn record_cache_set(&self) {}
    /// A cache delete was attempted.
    fn record_cache_delete(&self) {}
    /// A load was started by the leader of a singleflight group.
    fn record_load(&self) {}
    /// A load finished; `concurrency` is the follower count (including the
    /// leader) observed at completion time.
    fn record_load_concurrency(&self, concurrency: usize) {
        let _ = concurrency;
    }
}

/// No-op metrics provider (default).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsProvider;

impl MetricsProvider for NoopMetricsProvider {}

/// Adapter that reports through the `metrics` crate's global recorder.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCrateProvider;

#[cfg(feature = "metrics")]
impl MetricsProvider for MetricsCrateProvider {
    fn record_cache_get(&self) {
        metrics::counter!("crema_cache_get_total").increment(1);
    }

    fn record_cache_hit(&self) {
        metrics::counter!("crema_cache_hit_total").increment(1);
    }

    fn record_cache_set(&self) {
        metrics::counter!("crema_cache_set_total").increment(1);
    }

    fn record_cache_delete(&self) {
        metrics::counter!("crema_cache_delete_total").increment(1);
    }

    fn record_load(&self) {
        metrics::counter!("crema_load_total").increment(1);
    }

    fn record_load_concurrency(&self, concurrency: usize) {
        metrics::histogram!("crema_load_concurrency").record(concurrency as f64);
    }
}

/// Adapter that reports cache/loader events via `tracing`.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Default)]
pub struct TracingMetricsProvider {
    service_name: Option<String>,
}

#[cfg(feature = "tracing")]
impl TracingMetricsProvider {
    /// Create a new tracing metrics adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with a service name.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

#[cfg(feature = "tracing")]
impl MetricsProvider for TracingMetricsProvider {
    fn record_cache_get(&self) {
        tracing::trace!(target: "crema", event = "cache_get", service = ?self.service_name);
    }

    fn record_cache_hit(&self) {
        tracing::trace!(target: "crema", event = "cache_hit", service = ?self.service_name);
    }

    fn record_cache_set(&self) {
        tracing::trace!(target: "crema", event = "cache_set", service = ?self.service_name);
    }

    fn record_cache_delete(&self) {
        tracing::trace!(target: "crema", event = "cache_delete", service = ?self.service_name);
    }

    fn record_load(&self) {
        tracing::debug!(target: "crema", event = "load", service = ?self.service_name);
    }

    fn record_load_concurrency(&self, concurrency: usize) {
        tracing::debug!(
            target: "crema",
            event = "load_concurrency",
            concurrency,
            service = ?self.service_name,
        );
    }
}
