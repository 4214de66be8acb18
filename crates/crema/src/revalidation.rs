//! Probabilistic early revalidation curve.
//!
//! `p(t) = 1 - exp(-steepness * t)` where `t` is the remaining time to
//! expiry in milliseconds. The steepness is derived from a target window so
//! that `p(target) ≈ 0.999`, and the window actually enforced is the
//! smallest `t` at which `p(t) ≥ 0.995`.

const TARGET_PROBABILITY: f64 = 0.999;
const WINDOW_THRESHOLD_PROBABILITY: f64 = 0.995;

/// Applied when the caller passes a negative target window.
pub const DEFAULT_REVALIDATION_WINDOW_MILLIS: i64 = 300_000;

/// Curve parameters consumed by [`should_revalidate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevalidationCurve {
    steepness: f64,
    window_millis: i64,
}

impl RevalidationCurve {
    /// Derives the curve for a target revalidation window.
    ///
    /// A target of zero disables revalidation entirely (steepness 0, window
    /// 0 — [`should_revalidate`] then only ever fires on actual expiry). A
    /// negative target falls back to [`DEFAULT_REVALIDATION_WINDOW_MILLIS`].
    pub fn for_target_millis(target_millis: i64) -> Self {
        if target_millis == 0 {
            return Self {
                steepness: 0.0,
                window_millis: 0,
            };
        }
        let target_millis = if target_millis < 0 {
            DEFAULT_REVALIDATION_WINDOW_MILLIS
        } else {
            target_millis
        };

        let target = target_millis as f64;
        let steepness = -(1.0 - TARGET_PROBABILITY).ln() / target;
        let window = -(1.0 - WINDOW_THRESHOLD_PROBABILITY).ln() / steepness;

        Self {
            steepness,
            window_millis: window.ceil() as i64,
        }
    }

    /// The revalidation window in milliseconds.
    pub fn window_millis(&self) -> i64 {
        self.window_millis
    }

    /// The steepness parameter of the curve.
    pub fn steepness(&self) -> f64 {
        self.steepness
    }
}

impl Default for RevalidationCurve {
    fn default() -> Self {
        Self::for_target_millis(DEFAULT_REVALIDATION_WINDOW_MILLIS)
    }
}

/// Decides whether an entry expiring at `expire_at_millis` should be
/// revalidated, given the current time and a random draw in `[0, 1)`.
///
/// Always true once the entry has actually expired. Within the window,
/// fires with probability `p(remaining)`; outside it, never fires.
pub fn should_revalidate(
    curve: &RevalidationCurve,
    now_millis: i64,
    expire_at_millis: i64,
    random_draw: f64,
) -> bool {
    let remaining = expire_at_millis - now_millis;
    if remaining <= 0 {
        return true;
    }
    if remaining > curve.window_millis {
        return false;
    }
    let p = 1.0 - (-curve.steepness * remaining as f64).exp();
    random_draw < p
}
