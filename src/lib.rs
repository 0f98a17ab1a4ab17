//! # prompt-gateway
//!
//! Guardrail-and-routing gateway core sitting between a user-facing prompt
//! and an external language-model provider.
//!
//! ## Architecture
//!
//! Linear per-request decision pipeline, no branching back-edges:
//! ```text
//! GatewayRequest → TokenCount → CostEstimate → PiiScan → Redact → Route
//!               → LedgerUpdate → DecisionRecord
//! ```
//!
//! The pipeline itself performs no network I/O — model execution is an
//! external step taken by the caller after the [`DecisionRecord`] is emitted
//! (see [`executor::ModelExecutor`]).

// ── Lint policy (aerospace-grade) ─────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(missing_docs)]

use std::collections::HashMap;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod cost;
pub mod executor;
pub mod ledger;
pub mod metrics;
pub mod pii;
pub mod pipeline;
pub mod routing;
pub mod tokens;

// Re-exports for convenience
pub use config::{GatewayConfig, ThresholdEntry, TierConfig};
pub use cost::CostEstimate;
pub use executor::{Credential, EchoExecutor, ModelExecutor, OpenAiExecutor};
pub use ledger::{LedgerSnapshot, SavingsLedger};
pub use pii::{ComplianceMode, EntityCategory, EntityRecognition, PiiFinding, RegexRecognizer};
pub use pipeline::{DecisionRecord, Gateway};
pub use routing::RoutingDecision;
pub use tokens::{TiktokenEncoding, TokenEncoding, WhitespaceEncoding};

/// Initialise the global tracing subscriber.
///
/// Reads the `LOG_FORMAT` environment variable to choose output format:
/// - `"json"` — structured JSON output for production log aggregators
///   (Datadog, Grafana Loki, etc.)
/// - anything else (including unset) — human-readable pretty output
///   for local development
///
/// Filter level is controlled by `RUST_LOG` (e.g. `RUST_LOG=info`).
///
/// # Errors
///
/// Returns [`GatewayError::Other`] if the global subscriber has already
/// been set (e.g. by a previous call or a test harness).
///
/// # Panics
///
/// This function never panics.
///
/// # Example
///
/// ```no_run
/// # use prompt_gateway::{init_tracing, GatewayError};
/// # fn example() -> Result<(), GatewayError> {
/// init_tracing()?;
/// # Ok(()) }
/// ```
pub fn init_tracing() -> Result<(), GatewayError> {
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init(),
    };

    result.map_err(|e| GatewayError::Other(format!("tracing init failed: {e}")))
}

/// Top-level gateway errors.
///
/// Every error surface in the gateway is mapped to a variant here.
/// All variants implement `std::error::Error` via [`thiserror`].
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The PII-detection capability cannot be constructed.
    ///
    /// Fatal: the gateway fails closed rather than forwarding unscanned
    /// text, so this surfaces at startup, never mid-request.
    #[error("entity recognition unavailable: {0}")]
    RecognitionUnavailable(String),

    /// No execution credential was supplied for a provider call.
    ///
    /// The decision pipeline still completes and returns a
    /// [`DecisionRecord`]; only the downstream execution step refuses.
    #[error("no execution credential supplied")]
    CredentialMissing,

    /// An external model-execution call failed (network, API, or parsing
    /// error). Surfaced verbatim to the caller; no automatic retry.
    #[error("execution failed: {0}")]
    Execution(String),

    /// A configuration value is missing or invalid.
    ///
    /// This is returned at construction time so that misconfiguration
    /// surfaces immediately rather than at the first request.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Catch-all for errors that do not fit a specific variant.
    #[error("{0}")]
    Other(String),
}

/// Unique session identifier for request tracking and ledger scoping.
///
/// Sessions group related requests; the savings ledger lives exactly as long
/// as the session context that owns the [`Gateway`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(
    /// The raw string ID, typically a UUID or user-provided token.
    pub String,
);

impl SessionId {
    /// Create a new [`SessionId`] from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single prompt request submitted to the gateway.
///
/// Immutable once received; everything the pipeline derives from it is
/// discarded after the [`DecisionRecord`] is emitted.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Session this request belongs to.
    pub session: SessionId,
    /// Unique identifier for this individual request, used for trace correlation.
    pub request_id: String,
    /// The raw user-supplied prompt text.
    pub text: String,
    /// Target model family identifier (e.g., "gpt-4o"), used for token encoding.
    pub model_id: String,
    /// Arbitrary key-value metadata (e.g., `client`, `timestamp`).
    pub meta: HashMap<String, String>,
}

impl GatewayRequest {
    /// Construct a request with a random request ID and empty metadata.
    pub fn new(session: SessionId, text: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            session,
            request_id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            model_id: model_id.into(),
            meta: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_as_str_round_trips() {
        let session = SessionId::new("my-session");
        assert_eq!(session.as_str(), "my-session");
    }

    #[test]
    fn test_gateway_request_new_generates_unique_request_ids() {
        let a = GatewayRequest::new(SessionId::new("s1"), "hello", "gpt-4o");
        let b = GatewayRequest::new(SessionId::new("s1"), "hello", "gpt-4o");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_gateway_request_carries_model_id() {
        let req = GatewayRequest::new(SessionId::new("s1"), "hello", "gpt-4o");
        assert_eq!(req.model_id, "gpt-4o");
    }

    #[test]
    fn test_recognition_unavailable_display_includes_cause() {
        let err = GatewayError::RecognitionUnavailable("bad pattern".to_string());
        assert!(err.to_string().contains("bad pattern"));
    }

    #[test]
    fn test_credential_missing_display_mentions_credential() {
        let err = GatewayError::CredentialMissing;
        assert!(err.to_string().contains("credential"));
    }

    #[test]
    fn test_config_error_display_includes_message() {
        let err = GatewayError::ConfigError("no tiers configured".to_string());
        assert!(err.to_string().contains("no tiers configured"));
    }

    #[test]
    fn test_init_tracing_second_call_returns_err() {
        // First call may succeed or fail depending on test execution order
        // (another test may have already installed a subscriber).
        let _ = init_tracing();
        // Second call must not panic — it should return Err.
        let result = init_tracing();
        assert!(result.is_err(), "double init must return Err, not panic");
    }
}
