//! # Step: Gateway Configuration
//!
//! ## Responsibility
//! Define, default, load, and validate the gateway's governance settings:
//! the tier rate table, the routing threshold table, the warn-cost line,
//! and the session compliance mode.
//!
//! ## Guarantees
//! - Deterministic: same TOML input always produces the same `GatewayConfig`
//! - Validated: all semantic constraints are checked before a config is used
//! - Type-safe: invalid field combinations are caught at parse time via serde
//! - Schema-exportable: JSON Schema output enables IDE autocomplete
//!
//! ## NOT Responsible For
//! - Running the decision pipeline (that belongs to `pipeline`)
//! - Talking to model providers (that belongs to `executor`)

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pii::ComplianceMode;
use crate::GatewayError;

// ── Default value functions ────────────────────────────────────────────

/// Default warn-cost line: $0.0002 per request.
fn default_warn_cost_usd() -> f64 {
    0.0002
}

/// Default rate table: a cheap "low" tier and a premium "high" tier.
fn default_tiers() -> Vec<TierConfig> {
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

/// Default threshold table: below 50 tokens route low, otherwise high.
fn default_thresholds() -> Vec<ThresholdEntry> {
    vec![
        ThresholdEntry {
            max_tokens: Some(50),
            tier: "low".to_string(),
        },
        ThresholdEntry {
            max_tokens: None,
            tier: "high".to_string(),
        },
    ]
}

// ── Config types ───────────────────────────────────────────────────────

/// One service tier: a name, the model it maps to, and its price rate.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TierConfig {
    /// Tier name referenced by the threshold table (e.g., "low", "high").
    pub name: String,
    /// Model identifier the execution collaborator should invoke for this tier.
    pub model: String,
    /// Price per 1 000 billing tokens, in USD. Must be `>= 0`.
    pub cost_per_1k_tokens: f64,
}

/// One routing rule: requests with fewer tokens than `max_tokens` go to `tier`.
///
/// `max_tokens` is an exclusive upper bound; `None` marks the unbounded
/// catch-all entry, which must come last.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ThresholdEntry {
    /// Exclusive token upper bound, or `None` for the catch-all entry.
    pub max_tokens: Option<u64>,
    /// Tier name to route to. Must exist in the rate table.
    pub tier: String,
}

/// Root configuration for a gateway instance.
///
/// Deserialized from a TOML file and validated before use.
/// Every field has a documented default mirroring the two-tier setup.
///
/// # Example
///
/// ```toml
/// compliance = "strict"
/// warn_cost_usd = 0.0002
///
/// [[tiers]]
/// name = "low"
/// model = "gpt-4o-mini"
/// cost_per_1k_tokens = 0.00015
///
/// [[tiers]]
/// name = "high"
/// model = "gpt-4o"
/// cost_per_1k_tokens = 0.03
///
/// [[thresholds]]
/// max_tokens = 50
/// tier = "low"
///
/// [[thresholds]]
/// tier = "high"
/// ```
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GatewayConfig {
    /// Session compliance mode applied to detected PII.
    #[serde(default)]
    pub compliance: ComplianceMode,

    /// Per-request cost above which a warning is emitted.
    ///
    /// Observability only — the request is never gated on this value.
    #[serde(default = "default_warn_cost_usd")]
    pub warn_cost_usd: f64,

    /// The rate table: every service tier with its model and price rate.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,

    /// The routing threshold table, ascending, last entry unbounded.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<ThresholdEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            compliance: ComplianceMode::default(),
            warn_cost_usd: default_warn_cost_usd(),
            tiers: default_tiers(),
            thresholds: default_thresholds(),
        }
    }
}

impl GatewayConfig {
    /// Look up a tier by name.
    pub fn tier(&self, name: &str) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// The tier with the highest price rate — the savings baseline.
    ///
    /// Ties resolve to the first such tier in rate-table order.
    pub fn highest_tier(&self) -> Option<&TierConfig> {
        self.tiers.iter().reduce(|best, t| {
            if t.cost_per_1k_tokens > best.cost_per_1k_tokens {
                t
            } else {
                best
            }
        })
    }
}

// ── Loading ────────────────────────────────────────────────────────────

/// Errors raised while loading a [`GatewayConfig`] from disk.
///
/// I/O, parse, and validation failures are distinguished so startup
/// diagnostics can point at the right layer.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    /// The file could not be read.
    #[error("failed to read config file {file}: {source}")]
    Io {
        /// Path of the file that failed to read.
        file: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not well-formed TOML for this schema.
    #[error("failed to parse config file {file}: {source}")]
    Parse {
        /// Path or source name of the malformed input.
        file: String,
        /// Underlying TOML deserialization error.
        source: toml::de::Error,
    },

    /// The config parsed but violates a semantic constraint.
    #[error("invalid configuration:\n{0}")]
    Validation(String),
}

impl From<ConfigLoadError> for GatewayError {
    fn from(err: ConfigLoadError) -> Self {
        GatewayError::ConfigError(err.to_string())
    }
}

/// Load a [`GatewayConfig`] from a TOML file.
///
/// Reads the file, parses it as TOML, and validates all semantic constraints.
///
/// # Arguments
///
/// * `path` — Path to the TOML configuration file.
///
/// # Returns
///
/// - `Ok(GatewayConfig)` if the file is readable, well-formed, and valid.
/// - `Err(ConfigLoadError::Io)` if the file cannot be read.
/// - `Err(ConfigLoadError::Parse)` if the TOML is malformed.
/// - `Err(ConfigLoadError::Validation)` if semantic constraints are violated.
///
/// # Panics
///
/// This function never panics.
pub fn load_from_file(path: &Path) -> Result<GatewayConfig, ConfigLoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io {
        file: path.display().to_string(),
        source: e,
    })?;

    load_from_str(&content, &path.display().to_string())
}

/// Load a [`GatewayConfig`] from a TOML string.
///
/// Useful for testing or embedding configs without file I/O.
///
/// # Arguments
///
/// * `content` — TOML content as a string.
/// * `source_name` — Identifier for the source (used in error messages).
///
/// # Panics
///
/// This function never panics.
pub fn load_from_str(content: &str, source_name: &str) -> Result<GatewayConfig, ConfigLoadError> {
    let config: GatewayConfig = toml::from_str(content).map_err(|e| ConfigLoadError::Parse {
        file: source_name.to_string(),
        source: e,
    })?;

    let errors = validate(&config);
    if !errors.is_empty() {
        return Err(ConfigLoadError::Validation(errors.join("\n")));
    }

    Ok(config)
}

// ── Validation ─────────────────────────────────────────────────────────

/// Validate a [`GatewayConfig`], returning a list of human-readable errors.
///
/// # Arguments
///
/// * `config` — The gateway configuration to validate.
///
/// # Returns
///
/// An empty `Vec` on success, or one error string per violated constraint.
///
/// # Panics
///
/// This function never panics.
pub fn validate(config: &GatewayConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.tiers.is_empty() {
        errors.push("at least one tier must be configured".to_string());
    }

    for tier in &config.tiers {
        if tier.name.is_empty() {
            errors.push("tier name must not be empty".to_string());
        }
        if tier.model.is_empty() {
            errors.push(format!("tier '{}' has an empty model identifier", tier.name));
        }
        if tier.cost_per_1k_tokens < 0.0 {
            errors.push(format!(
                "tier '{}' cost_per_1k_tokens must be >= 0, got {}",
                tier.name, tier.cost_per_1k_tokens
            ));
        }
    }

    let mut seen = std::collections::HashSet::new();
    for tier in &config.tiers {
        if !seen.insert(tier.name.as_str()) {
            errors.push(format!("duplicate tier name '{}'", tier.name));
        }
    }

    if config.warn_cost_usd < 0.0 {
        errors.push(format!(
            "warn_cost_usd must be >= 0, got {}",
            config.warn_cost_usd
        ));
    }

    if config.thresholds.is_empty() {
        errors.push("threshold table must not be empty".to_string());
    }

    for entry in &config.thresholds {
        if config.tier(&entry.tier).is_none() {
            errors.push(format!(
                "threshold entry references unknown tier '{}'",
                entry.tier
            ));
        }
    }

    let mut last_bound: Option<u64> = None;
    for (i, entry) in config.thresholds.iter().enumerate() {
        let is_last = i + 1 == config.thresholds.len();
        match entry.max_tokens {
            Some(bound) => {
                if is_last {
                    errors.push(format!(
                        "last threshold entry must be unbounded, got max_tokens = {bound}"
                    ));
                }
                if let Some(prev) = last_bound {
                    if bound <= prev {
                        errors.push(format!(
                            "threshold bounds must be strictly ascending: {bound} after {prev}"
                        ));
                    }
                }
                last_bound = Some(bound);
            }
            None => {
                if !is_last {
                    errors.push(
                        "only the last threshold entry may be unbounded".to_string(),
                    );
                }
            }
        }
    }

    errors
}

// ── Tests ──────────────────────────────────────────────────────────────
