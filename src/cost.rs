//! Dual-tier cost estimation.
//!
//! Computes the estimated spend for a token count under every configured
//! tier's price rate. Costs are stored as micro-dollars
//! (1 USD = 1 000 000 micro-dollars) to avoid floating-point drift in
//! long-running aggregations; conversion to USD happens only at the edges.

use crate::config::TierConfig;

/// Estimated cost for one tier.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierCost {
    /// Tier name this cost was computed for.
    pub tier: String,
    /// Estimated cost in micro-dollars.
    pub micro_usd: u64,
}

/// Per-tier cost estimate for a single request.
///
/// Computed for every configured tier unconditionally — the tiers that are
/// not chosen still feed the savings accounting.
///
/// # Panics
///
/// This type and its methods never panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostEstimate {
    costs: Vec<TierCost>,
}

impl CostEstimate {
    /// Look up the estimated cost for a tier, in micro-dollars.
    ///
    /// Returns `None` for tiers absent from the rate table.
    pub fn cost_micro(&self, tier: &str) -> Option<u64> {
        self.costs.iter().find(|c| c.tier == tier).map(|c| c.micro_usd)
    }

    /// Look up the estimated cost for a tier, in USD.
    pub fn cost_usd(&self, tier: &str) -> Option<f64> {
        self.cost_micro(tier).map(micro_to_usd)
    }

    /// The cheapest tier in this estimate, if any tier is configured.
    pub fn cheapest(&self) -> Option<&TierCost> {
        self.costs.iter().min_by_key(|c| c.micro_usd)
    }

    /// The priciest tier in this estimate, if any tier is configured.
    pub fn priciest(&self) -> Option<&TierCost> {
        self.costs.iter().max_by_key(|c| c.micro_usd)
    }

    /// Iterate over all per-tier costs, in rate-table order.
    pub fn iter(&self) -> impl Iterator<Item = &TierCost> {
        self.costs.iter()
    }
}

/// Estimate the cost of `tokens` under every tier in the rate table.
///
/// Cost for tier t = `tokens / 1000 * rate[t]`, computed in micro-dollar
/// fixed point with a widened intermediate so large token counts cannot
/// overflow.
///
/// # Arguments
///
/// * `tokens` — Billing token count for the request.
/// * `tiers` — The configured rate table.
///
/// # Returns
///
/// A [`CostEstimate`] with one entry per configured tier.
///
/// # Panics
///
/// This function never panics.
pub fn estimate(tokens: u64, tiers: &[TierConfig]) -> CostEstimate {
    let costs = tiers
        .iter()
        .map(|tier| {
            let rate_micro = usd_to_micro(tier.cost_per_1k_tokens);
            let micro = (u128::from(tokens) * u128::from(rate_micro)) / 1000;
            TierCost {
                tier: tier.name.clone(),
                micro_usd: u64::try_from(micro).unwrap_or(u64::MAX),
            }
        })
        .collect();

    CostEstimate { costs }
}

// ── Fixed-point helpers ────────────────────────────────────────────────

/// Convert a USD amount to micro-dollars.
pub fn usd_to_micro(usd: f64) -> u64 {
    (usd * 1_000_000.0) as u64
}

/// Convert micro-dollars to USD.
pub fn micro_to_usd(micro: u64) -> f64 {
    micro as f64 / 1_000_000.0
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tier_table() -> Vec<TierConfig> {
        vec![
            TierConfig {
                name: "low".to_string(),
                model: "gpt-4o-mini".to_string(),
                cost_per_1k_tokens: 0.00015,
            },
            TierConfig {
                name: "high".to_string(),
                model: "gpt-4o".to_string(),
                cost_per_1k_tokens: 0.03,
            },
        ]
    }

    // -- helpers ---------------------------------------------------------

    #[test]
    fn test_usd_to_micro_zero() {
        assert_eq!(usd_to_micro(0.0), 0);
    }

    #[test]
    fn test_usd_to_micro_one_dollar() {
        assert_eq!(usd_to_micro(1.0), 1_000_000);
    }

    #[test]
    fn test_usd_to_micro_fractional() {
        assert_eq!(usd_to_micro(0.03), 30_000);
    }

    #[test]
    fn test_micro_to_usd_round_trip() {
        let original = 0.03;
        let back = micro_to_usd(usd_to_micro(original));
        assert!((back - original).abs() < 1e-6);
    }

    // -- estimation ------------------------------------------------------

    #[test]
    fn test_estimate_covers_every_configured_tier() {
        let est = estimate(1000, &two_tier_table());
        assert!(est.cost_micro("low").is_some());
        assert!(est.cost_micro("high").is_some());
        assert!(est.cost_micro("absent").is_none());
    }

    #[test]
    fn test_estimate_exact_values_at_1k_tokens() {
        let est = estimate(1000, &two_tier_table());
        // 1000 tokens at $0.03/1K = $0.03 = 30 000 micro-dollars.
        assert_eq!(est.cost_micro("high"), Some(30_000));
        // 1000 tokens at $0.00015/1K = $0.00015 = 150 micro-dollars.
        assert_eq!(est.cost_micro("low"), Some(150));
    }

    #[test]
    fn test_estimate_zero_tokens_costs_zero_everywhere() {
        let est = estimate(0, &two_tier_table());
        assert_eq!(est.cost_micro("low"), Some(0));
        assert_eq!(est.cost_micro("high"), Some(0));
    }

    #[test]
    fn test_high_rate_dominates_low_rate_at_equal_tokens() {
        // rate_high >= rate_low ⇒ cost_high >= cost_low, strict for t > 0.
        for tokens in [1_u64, 49, 50, 1000, 1_000_000] {
            let est = estimate(tokens, &two_tier_table());
            let low = est.cost_micro("low").expect("test: low tier");
            let high = est.cost_micro("high").expect("test: high tier");
            assert!(
                high > low,
                "tokens={tokens}: high ({high}) must exceed low ({low})"
            );
        }
    }

    #[test]
    fn test_equal_rates_yield_equal_costs() {
        let tiers = vec![
            TierConfig {
                name: "a".to_string(),
                model: "m-a".to_string(),
                cost_per_1k_tokens: 0.01,
            },
            TierConfig {
                name: "b".to_string(),
                model: "m-b".to_string(),
                cost_per_1k_tokens: 0.01,
            },
        ];
        let est = estimate(12_345, &tiers);
        assert_eq!(est.cost_micro("a"), est.cost_micro("b"));
    }

    #[test]
    fn test_cheapest_and_priciest_pick_expected_tiers() {
        let est = estimate(500, &two_tier_table());
        assert_eq!(est.cheapest().map(|c| c.tier.as_str()), Some("low"));
        assert_eq!(est.priciest().map(|c| c.tier.as_str()), Some("high"));
    }

    #[test]
    fn test_estimate_empty_rate_table_yields_empty_estimate() {
        let est = estimate(1000, &[]);
        assert!(est.cheapest().is_none());
        assert!(est.priciest().is_none());
        assert_eq!(est.iter().count(), 0);
    }

    #[test]
    fn test_cost_usd_converts_from_micro() {
        let est = estimate(1000, &two_tier_table());
        let usd = est.cost_usd("high").expect("test: high tier");
        assert!((usd - 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_huge_token_count_saturates_instead_of_overflowing() {
        let tiers = vec![TierConfig {
            name: "high".to_string(),
            model: "m".to_string(),
            cost_per_1k_tokens: f64::MAX,
        }];
        // Must not panic; saturates at u64::MAX.
        let est = estimate(u64::MAX, &tiers);
        assert!(est.cost_micro("high").is_some());
    }
}
