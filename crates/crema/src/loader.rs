//! Sharded singleflight loader: coalesces concurrent loads of the same key
//! into a single in-flight execution.

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher, RandomState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crema_core::LoadError;

const MIN_SHARD_COUNT: usize = 8;
const MAX_SHARD_COUNT: usize = 32;
const SHARD_MULTIPLIER: usize = 2;

fn shard_count() -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (parallelism * SHARD_MULTIPLIER).clamp(MIN_SHARD_COUNT, MAX_SHARD_COUNT)
}

struct Inflight<V, E> {
    completed: AtomicBool,
    notify: Notify,
    result: Mutex<Option<Result<V, E>>>,
    refs: Mutex<usize>,
    cancel_token: CancellationToken,
}

impl<V, E> Inflight<V, E> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            completed: AtomicBool::new(false),
            notify: Notify::new(),
            result: Mutex::new(None),
            refs: Mutex::new(1),
            cancel_token: CancellationToken::new(),
        })
    }
}

struct Shard<V, E> {
    inflight: Mutex<HashMap<String, Arc<Inflight<V, E>>>>,
}

impl<V, E> Shard<V, E> {
    fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

/// Coalesces concurrent `get_or_load` calls for the same key into a single
/// loader execution, sharded to bound lock contention.
///
/// The loader runs with an independent [`CancellationToken`] that is never
/// cancelled by any individual caller dropping out — only once every caller
/// has released its reference does the in-flight load's token get cancelled.
pub struct SingleflightLoader<V, E> {
    shards: Vec<Shard<V, E>>,
    hasher: RandomState,
}

impl<V, E> SingleflightLoader<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Construct a loader with a shard count derived from
    /// [`std::thread::available_parallelism`].
    pub fn new() -> Self {
        let shards = (0..shard_count()).map(|_| Shard::new()).collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard_for(&self, key: &str) -> &Shard<V, E> {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    fn acquire(&self, key: &str) -> (Arc<Inflight<V, E>>, bool) {
        let shard = self.shard_for(key);
        let mut map = shard.inflight.lock();
        match map.get(key) {
            Some(existing) if existing.completed.load(Ordering::Acquire) => {
                let fresh = Inflight::new();
                map.insert(key.to_string(), fresh.clone());
                (fresh, true)
            }
            Some(existing) => {
                *existing.refs.lock() += 1;
                (existing.clone(), false)
            }
            None => {
                let fresh = Inflight::new();
                map.insert(key.to_string(), fresh.clone());
                (fresh, true)
            }
        }
    }

    fn release(&self, key: &str, inflight: &Arc<Inflight<V, E>>) {
        let shard = self.shard_for(key);
        let mut map = shard.inflight.lock();
        let mut refs = inflight.refs.lock();
        *refs -= 1;
        if *refs == 0 {
            if let Some(current) = map.get(key) {
                if Arc::ptr_eq(current, inflight) {
                    map.remove(key);
                }
            }
            inflight.cancel_token.cancel();
        }
    }

    /// Loads `key`, running `loader` at most once across all concurrent
    /// callers. `cancel` only affects this caller's wait — it does not stop
    /// the load for other callers sharing the same in-flight execution.
    pub async fn load<F, Fut, M>(
        &self,
        key: &str,
        cancel: CancellationToken,
        loader: F,
        metrics: &M,
    ) -> Result<(V, bool), LoadError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<V, E>> + Send + 'static,
        M: crema_core::MetricsProvider + Clone,
    {
        let (inflight, leader) = self.acquire(key);

        if leader {
            metrics.record_load();
            let inf = inflight.clone();
            let load_token = inf.cancel_token.clone();
            let metrics = metrics.clone();
            tokio::spawn(async move {
                let result = loader(load_token).await;
                *inf.result.lock() = Some(result);
                let refs = *inf.refs.lock();
                inf.completed.store(true, Ordering::Release);
                inf.notify.notify_waiters();
                metrics.record_load_concurrency(refs);
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.release(key, &inflight);
                Err(LoadError::Cancelled)
            }
            _ = wait_for_completion(&inflight) => {
                let result = inflight.result.lock().clone();
                self.release(key, &inflight);
                match result {
                    Some(Ok(v)) => Ok((v, leader)),
                    Some(Err(e)) => Err(LoadError::Loader(e)),
                    None => unreachable!("notified without a result set"),
                }
            }
        }
    }
}

impl<V, E> Default for SingleflightLoader<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_completion<V, E>(inflight: &Inflight<V, E>) {
    if inflight.completed.load(Ordering::Acquire) {
        return;
    }
    let notified = inflight.notify.notified();
    if inflight.completed.load(Ordering::Acquire) {
        return;
    }
    notified.await;
}

/// Runs the loader directly with no coalescing — every call is its own
/// leader. Useful when callers already deduplicate upstream, or for tests
/// that want deterministic, uncoalesced load counts.
pub struct DirectLoader;

impl DirectLoader {
    /// Loads `key` by invoking `loader` immediately.
    pub async fn load<V, E, F, Fut>(
        &self,
        cancel: CancellationToken,
        loader: F,
    ) -> Result<(V, bool), LoadError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<V, E>> + Send + 'static,
    {
        let result = loader(cancel).await;
        match result {
            Ok(v) => Ok((v, true)),
            Err(e) => Err(LoadError::Loader(e)),
        }
    }
}

/// The loader strategy a [`crate::Cache`] delegates to: coalescing
/// (default) or direct pass-through (`.with_direct_loader()`).
pub enum Loader<V, E> {
    /// Coalesces concurrent loads of the same key.
    Singleflight(SingleflightLoader<V, E>),
    /// Runs every call independently.
    Direct(DirectLoader),
}

impl<V, E> Loader<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// The default coalescing strategy.
    pub fn singleflight() -> Self {
        Self::Singleflight(SingleflightLoader::new())
    }

    /// The direct, non-coalescing strategy.
    pub fn direct() -> Self {
        Self::Direct(DirectLoader)
    }

    pub(crate) async fn load<F, Fut, M>(
        &self,
        key: &str,
        cancel: CancellationToken,
        loader: F,
        metrics: &M,
    ) -> Result<(V, bool), LoadError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<V, E>> + Send + 'static,
        M: crema_core::MetricsProvider + Clone,
    {
        match self {
            Self::Singleflight(s) => s.load(key, cancel, loader, metrics).await,
            Self::Direct(d) => d.load(cancel, loader).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crema_core::NoopMetricsProvider;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn loader() -> SingleflightLoader<i32, String> {
        SingleflightLoader::new()
    }

    #[tokio::test]
    async fn test_loads_once_and_returns_leader() {
        let l = loader();
        let (v, leader) = l
            .load(
                "k",
                CancellationToken::new(),
                |_| async { Ok::<_, String>(42) },
                &NoopMetricsProvider,
            )
            .await
            .unwrap();
        assert_eq!(v, 42);
        assert!(leader);
    }

    #[tokio::test]
    async fn test_shared_when_concurrent() {
        let l = Arc::new(loader());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let l = l.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                l.load(
                    "shared",
                    CancellationToken::new(),
                    move |_| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok::<_, String>(7)
                    },
                    &NoopMetricsProvider,
                )
                .await
            }));
        }

        let mut leader_count = 0;
        for h in handles {
            let (v, leader) = h.await.unwrap().unwrap();
            assert_eq!(v, 7);
            if leader {
                leader_count += 1;
            }
        }
        assert_eq!(leader_count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_caller_cancellation_returns_cancelled() {
        let l = loader();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = l
            .load(
                "k",
                cancel,
                |_| async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok::<_, String>(1)
                },
                &NoopMetricsProvider,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Cancelled));
    }

    #[tokio::test]
    async fn test_leader_cancellation_does_not_block() {
        let l = Arc::new(loader());
        let cancel = CancellationToken::new();
        let c2 = cancel.clone();

        let l2 = l.clone();
        let handle = tokio::spawn(async move {
            l2.load(
                "k",
                c2,
                |_| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, String>(9)
                },
                &NoopMetricsProvider,
            )
            .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_millis(50), handle)
            .await
            .expect("leader's own cancellation must not block its return")
            .unwrap();
        assert!(matches!(result, Err(LoadError::Cancelled)));
    }

    #[tokio::test]
    async fn test_acquire_after_done_replaces_inflight() {
        let l = loader();
        let (v1, leader1) = l
            .load(
                "k",
                CancellationToken::new(),
                |_| async { Ok::<_, String>(1) },
                &NoopMetricsProvider,
            )
            .await
            .unwrap();
        assert_eq!(v1, 1);
        assert!(leader1);

        let (v2, leader2) = l
            .load(
                "k",
                CancellationToken::new(),
                |_| async { Ok::<_, String>(2) },
                &NoopMetricsProvider,
            )
            .await
            .unwrap();
        assert_eq!(v2, 2);
        assert!(leader2);
    }

    #[tokio::test]
    async fn test_propagates_loader_error_verbatim() {
        let l = loader();
        let err = l
            .load(
                "k",
                CancellationToken::new(),
                |_| async { Err::<i32, _>("boom".to_string()) },
                &NoopMetricsProvider,
            )
            .await
            .unwrap_err();
        match err {
            LoadError::Loader(msg) => assert_eq!(msg, "boom"),
            LoadError::Cancelled => panic!("expected loader error"),
        }
    }

    #[tokio::test]
    async fn test_direct_loader_never_coalesces() {
        let calls = Arc::new(AtomicUsize::new(0));
        let direct = DirectLoader;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let calls = calls.clone();
            handles.push(direct.load::<i32, String, _, _>(
                CancellationToken::new(),
                move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                },
            ));
        }
        for h in handles {
            let (v, leader) = h.await.unwrap();
            assert_eq!(v, 1);
            assert!(leader);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_many_keys_concurrent_fuzz() {
        let l = Arc::new(loader());
        let per_key_calls: Arc<Vec<AtomicUsize>> =
            Arc::new((0..16).map(|_| AtomicUsize::new(0)).collect());

        let mut handles = Vec::new();
        for i in 0..200u32 {
            let l = l.clone();
            let per_key_calls = per_key_calls.clone();
            let key_idx = (i % 16) as usize;
            handles.push(tokio::spawn(async move {
                let key = format!("key-{key_idx}");
                l.load(
                    &key,
                    CancellationToken::new(),
                    move |_| {
                        let per_key_calls = per_key_calls.clone();
                        async move {
                            per_key_calls[key_idx].fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            Ok::<_, String>(key_idx as i32)
                        }
                    },
                    &NoopMetricsProvider,
                )
                .await
            }));
        }

        for h in handles {
            h.await.unwrap().unwrap();
        }

        for counter in per_key_calls.iter() {
            assert!(counter.load(Ordering::SeqCst) >= 1);
        }
    }

    #[derive(Clone, Default)]
    struct CountingMetrics {
        load_calls: Arc<AtomicUsize>,
        concurrency_calls: Arc<AtomicUsize>,
        last_concurrency: Arc<AtomicUsize>,
    }

    impl crema_core::MetricsProvider for CountingMetrics {
        fn record_load(&self) {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn record_load_concurrency(&self, concurrency: usize) {
            self.concurrency_calls.fetch_add(1, Ordering::SeqCst);
            self.last_concurrency.store(concurrency, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_record_load_concurrency_fires_once_per_group_with_total_refs() {
        let l = Arc::new(loader());
        let metrics = CountingMetrics::default();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let l = l.clone();
            let metrics = metrics.clone();
            handles.push(tokio::spawn(async move {
                l.load(
                    "shared",
                    CancellationToken::new(),
                    |_| async {
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok::<_, String>(1)
                    },
                    &metrics,
                )
                .await
            }));
        }

        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(metrics.load_calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.concurrency_calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.last_concurrency.load(Ordering::SeqCst), 5);
    }
}
