//! Session savings ledger.
//!
//! Tracks the cumulative savings achieved by tier selection across a
//! session: for each processed request, the difference between what the
//! highest tier would have cost and what the chosen tier costs.
//!
//! Thread-safe: the running total uses atomic read-modify-write so
//! concurrent `record` calls never lose updates. Savings are stored as
//! micro-dollars (1 USD = 1 000 000 micro-dollars) to avoid floating-point
//! drift in long-running aggregations.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cost::{micro_to_usd, CostEstimate};

/// Session-scoped running total of savings from tier selection.
///
/// Lifetime is bound to the session context that owns it; it is not
/// durable and starts at zero. `record` is the only mutator; reads never
/// mutate.
///
/// # Panics
///
/// This type and its methods never panic.
#[derive(Debug, Default)]
pub struct SavingsLedger {
    /// Accumulated savings in micro-dollars.
    savings_micro: AtomicU64,
    /// Number of requests recorded.
    requests: AtomicU64,
}

impl SavingsLedger {
    /// Create a new ledger with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request's savings and return the new running total in USD.
    ///
    /// `delta = cost[highest_tier] − cost[chosen_tier]`, clamped at zero —
    /// with a correctly ordered rate table the delta is never negative, and
    /// a misordered table must not drive the monotone total backwards.
    ///
    /// # Arguments
    ///
    /// * `estimate` — The per-tier cost estimate for the request.
    /// * `chosen_tier` — The tier the router selected.
    /// * `highest_tier` — The priciest configured tier (the baseline).
    ///
    /// # Returns
    ///
    /// The running total after this request, in USD.
    ///
    /// # Panics
    ///
    /// This function never panics.
    pub fn record(&self, estimate: &CostEstimate, chosen_tier: &str, highest_tier: &str) -> f64 {
        let highest = estimate.cost_micro(highest_tier).unwrap_or(0);
        let chosen = estimate.cost_micro(chosen_tier).unwrap_or(0);
        let delta = highest.saturating_sub(chosen);

        let previous = self.savings_micro.fetch_add(delta, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);

        micro_to_usd(previous.saturating_add(delta))
    }

    /// Current running total in USD. Never mutates.
    pub fn total_usd(&self) -> f64 {
        micro_to_usd(self.savings_micro.load(Ordering::Relaxed))
    }

    /// Point-in-time snapshot of the ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            savings_usd: self.total_usd(),
            requests: self.requests.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero (session start).
    pub fn reset(&self) {
        self.savings_micro.store(0, Ordering::Relaxed);
        self.requests.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of ledger state.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    /// Accumulated savings in USD.
    pub savings_usd: f64,
    /// Number of requests recorded.
    pub requests: u64,
}

// ── Tests ──────────────────────────────────────────────────────────────
