//! # Step: Tier Routing Policy
//!
//! ## Responsibility
//! Map a request's token count onto a service tier using the configured
//! threshold table: an ascending list of (exclusive upper bound, tier)
//! pairs with an unbounded catch-all last entry.
//!
//! ## Guarantees
//! - Deterministic: the same token count and table always produce the same
//!   decision.
//! - Pure and total: no I/O, no allocation beyond the returned record, a
//!   decision for every input.
//! - Boundary-exact: `tokens < bound` selects the entry; `tokens == bound`
//!   falls through to the next one.
//!
//! ## NOT Responsible For
//! - Cost arithmetic (that belongs to `cost`)
//! - Savings accounting (that belongs to `ledger`)
//! - Calling the chosen tier's model (that belongs to `executor`)

use serde::Serialize;

use crate::config::ThresholdEntry;

/// The routing decision for a single request.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    /// The chosen tier name.
    pub tier: String,
    /// Human-readable reason for the choice.
    pub reason: String,
}

/// Route a token count through the threshold table.
///
/// Selects the first entry whose exclusive upper bound strictly exceeds
/// `tokens`; the unbounded last entry catches everything else. With the
/// two-tier default table this reproduces the single-threshold rule:
/// `tokens < 50` → "low", `tokens >= 50` → "high".
///
/// # Arguments
///
/// * `tokens` — Billing token count for the request.
/// * `thresholds` — Ascending threshold table, last entry unbounded.
///
/// # Returns
///
/// A [`RoutingDecision`] naming the chosen tier and the reason.
///
/// # Panics
///
/// This function never panics.
pub fn route(tokens: u64, thresholds: &[ThresholdEntry]) -> RoutingDecision {
    for entry in thresholds {
        match entry.max_tokens {
            Some(bound) if tokens < bound => {
                return RoutingDecision {
                    tier: entry.tier.clone(),
                    reason: format!("below complexity threshold (token count < {bound})"),
                };
            }
            Some(_) => {}
            None => {
                return RoutingDecision {
                    tier: entry.tier.clone(),
                    reason: "above complexity threshold".to_string(),
                };
            }
        }
    }

    // Unreachable with a validated table (last entry is unbounded); kept
    // total for direct callers with arbitrary tables.
    match thresholds.last() {
        Some(entry) => RoutingDecision {
            tier: entry.tier.clone(),
            reason: "above complexity threshold".to_string(),
        },
        None => RoutingDecision {
            tier: String::new(),
            reason: "empty threshold table".to_string(),
        },
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
