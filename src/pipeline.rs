//! # Step: Decision Pipeline
//!
//! ## Responsibility
//! Orchestrate one request through the linear decision sequence —
//! token accounting, per-tier cost estimation, PII scanning, compliance
//! redaction, tier routing, ledger update — and emit a [`DecisionRecord`].
//!
//! ## Guarantees
//! - Linear: no branching back-edges; `Emitted` is the only terminal state.
//! - Pure per request: all components are stateless over injected
//!   configuration; the savings ledger is the only mutable state and
//!   serializes its updates.
//! - No I/O: the pipeline never touches the network; model execution is the
//!   caller's step after the record is emitted.
//! - Fail closed: a gateway cannot be constructed without a working
//!   recognizer, so no text is ever forwarded unscanned.
//!
//! ## Span Fields (per request)
//!
//! | Field | Description |
//! |-------|-------------|
//! | `session_id` | Session this request belongs to |
//! | `request_id` | Unique ID for trace correlation |
//! | `duration_ms` | Recorded after the record is emitted |
//! | `outcome` | Always `"ok"` — the pipeline is total |
//!
//! ## Sensitive Fields — NEVER Logged
//!
//! - Prompt content (raw or redacted)
//! - Finding spans or matched text
//! - Credentials

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn, Span};

use crate::config::{self, GatewayConfig};
use crate::cost;
use crate::ledger::SavingsLedger;
use crate::metrics;
use crate::pii::{redact, ComplianceMode, EntityCategory, EntityRecognition, RegexRecognizer};
use crate::routing;
use crate::tokens::{TiktokenEncoding, TokenEncoding};
use crate::{GatewayError, GatewayRequest};

/// The structured decision for one request — the unit the external
/// execution collaborator consumes.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    /// Billing token count for the prompt.
    pub tokens: u64,
    /// Estimated cost under the cheapest configured tier, in USD.
    pub cost_low_usd: f64,
    /// Estimated cost under the priciest configured tier, in USD.
    pub cost_high_usd: f64,
    /// Number of PII findings the scanner reported.
    pub pii_finding_count: usize,
    /// Whether any finding span was replaced before forwarding.
    pub redacted: bool,
    /// Whether the request was flagged as a logged compliance exception.
    pub audit_flagged: bool,
    /// The tier the router selected.
    pub chosen_tier: String,
    /// The model identifier the chosen tier maps to.
    pub chosen_model: String,
    /// Human-readable routing reason.
    pub routing_reason: String,
    /// The text eligible for forwarding to the provider.
    pub forwarded_text: String,
    /// Session savings running total after this request, in USD.
    pub session_savings_after_usd: f64,
}

/// The gateway: injected capabilities, governance configuration, and the
/// session savings ledger, bundled as an explicit session context.
///
/// Stateless across requests apart from the ledger; safe to share behind an
/// `Arc` and invoke concurrently.
///
/// # Panics
///
/// This type and its methods never panic.
pub struct Gateway {
    config: GatewayConfig,
    encoding: Arc<dyn TokenEncoding>,
    recognizer: Arc<dyn EntityRecognition>,
    ledger: SavingsLedger,
}

impl Gateway {
    /// Build a gateway from a validated configuration and injected
    /// capability providers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if the configuration violates
    /// any semantic constraint. Misconfiguration surfaces here, never
    /// mid-request.
    ///
    /// # Panics
    ///
    /// This function never panics.
    pub fn new(
        config: GatewayConfig,
        encoding: Arc<dyn TokenEncoding>,
        recognizer: Arc<dyn EntityRecognition>,
    ) -> Result<Self, GatewayError> {
        let errors = config::validate(&config);
        if !errors.is_empty() {
            return Err(GatewayError::ConfigError(errors.join("\n")));
        }

        Ok(Self {
            config,
            encoding,
            recognizer,
            ledger: SavingsLedger::new(),
        })
    }

    /// Build a gateway with the default capability providers:
    /// [`TiktokenEncoding`] and [`RegexRecognizer`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RecognitionUnavailable`] if the recognizer
    /// cannot be constructed — the gateway fails closed rather than running
    /// without PII scanning — or [`GatewayError::ConfigError`] if the token
    /// encoding or configuration is unusable.
    ///
    /// # Panics
    ///
    /// This function never panics.
    pub fn with_defaults(config: GatewayConfig) -> Result<Self, GatewayError> {
        let encoding = Arc::new(TiktokenEncoding::new()?);
        let recognizer = Arc::new(RegexRecognizer::new()?);
        Self::new(config, encoding, recognizer)
    }

    /// Run one request through the decision pipeline.
    ///
    /// Total: every request produces a record. The compliance mode is
    /// selected per request, not derived from the findings.
    ///
    /// # Arguments
    ///
    /// * `request` — The prompt request to decide on.
    /// * `mode` — The compliance mode for this request.
    ///
    /// # Returns
    ///
    /// The emitted [`DecisionRecord`].
    ///
    /// # Panics
    ///
    /// This function never panics.
    pub fn handle_request(&self, request: &GatewayRequest, mode: ComplianceMode) -> DecisionRecord {
        let overall_start = Instant::now();
        let span = tracing::info_span!(
            "gateway.request",
            session_id = %request.session.as_str(),
            request_id = %request.request_id,
            model_id = %request.model_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );
        let _enter = span.enter();

        // 1. Token accounting
        let step_start = Instant::now();
        let tokens = self.encoding.count(&request.text, &request.model_id);
        metrics::inc_step("token_count");
        metrics::record_step_latency("token_count", step_start.elapsed());

        // 2. Cost estimation across every configured tier
        let step_start = Instant::now();
        let estimate = cost::estimate(tokens, &self.config.tiers);
        metrics::inc_step("cost_estimate");
        metrics::record_step_latency("cost_estimate", step_start.elapsed());

        // 3. PII scan
        let step_start = Instant::now();
        let findings = self.recognizer.scan(&request.text);
        for category in EntityCategory::ALL {
            let count = findings.iter().filter(|f| f.category == category).count() as u64;
            if count > 0 {
                metrics::add_pii_findings(category.as_str(), count);
            }
        }
        metrics::inc_step("pii_scan");
        metrics::record_step_latency("pii_scan", step_start.elapsed());

        // 4. Compliance redaction
        let step_start = Instant::now();
        let outcome = redact(&request.text, &findings, mode);
        if outcome.redacted {
            metrics::inc_redaction(mode.as_str());
        }
        metrics::inc_step("redact");
        metrics::record_step_latency("redact", step_start.elapsed());

        if !findings.is_empty() {
            info!(
                target: "gateway::pipeline",
                request_id = %request.request_id,
                findings = findings.len(),
                mode = mode.as_str(),
                redacted = outcome.redacted,
                audit_flagged = outcome.audit_flagged,
                "sensitive entities detected"
            );
        }

        // 5. Routing
        let step_start = Instant::now();
        let decision = routing::route(tokens, &self.config.thresholds);
        metrics::inc_step("route");
        metrics::record_step_latency("route", step_start.elapsed());

        // 6. Ledger update — the pipeline's only mutation
        let step_start = Instant::now();
        let highest_tier = self
            .config
            .highest_tier()
            .map(|t| t.name.clone())
            .unwrap_or_default();
        let savings_after = self
            .ledger
            .record(&estimate, &decision.tier, &highest_tier);
        metrics::set_session_savings(savings_after);
        metrics::inc_step("ledger");
        metrics::record_step_latency("ledger", step_start.elapsed());

        let chosen_cost_usd = estimate.cost_usd(&decision.tier).unwrap_or(0.0);
        if chosen_cost_usd > self.config.warn_cost_usd {
            // Observability only — the request is never gated on cost.
            metrics::inc_cost_warning();
            warn!(
                target: "gateway::pipeline",
                request_id = %request.request_id,
                tier = %decision.tier,
                cost_usd = chosen_cost_usd,
                warn_cost_usd = self.config.warn_cost_usd,
                "request cost exceeds warn line"
            );
        }

        let chosen_model = self
            .config
            .tier(&decision.tier)
            .map(|t| t.model.clone())
            .unwrap_or_default();

        info!(
            target: "gateway::pipeline",
            request_id = %request.request_id,
            tokens,
            tier = %decision.tier,
            reason = %decision.reason,
            "routing decision"
        );

        let record = DecisionRecord {
            tokens,
            cost_low_usd: estimate.cheapest().map_or(0.0, |c| {
                cost::micro_to_usd(c.micro_usd)
            }),
            cost_high_usd: estimate.priciest().map_or(0.0, |c| {
                cost::micro_to_usd(c.micro_usd)
            }),
            pii_finding_count: findings.len(),
            redacted: outcome.redacted,
            audit_flagged: outcome.audit_flagged,
            chosen_tier: decision.tier,
            chosen_model,
            routing_reason: decision.reason,
            forwarded_text: outcome.text,
            session_savings_after_usd: savings_after,
        };

        let elapsed = overall_start.elapsed();
        Span::current().record("duration_ms", elapsed.as_millis() as u64);
        Span::current().record("outcome", "ok");

        record
    }

    /// The session savings ledger.
    pub fn ledger(&self) -> &SavingsLedger {
        &self.ledger
    }

    /// The active configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
