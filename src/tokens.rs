//! # Step: Token Accounting
//!
//! ## Responsibility
//! Turn prompt text plus a model identifier into an exact token count for
//! billing-grade cost estimation. The encoding itself is an external
//! capability consumed through the [`TokenEncoding`] trait.
//!
//! ## Guarantees
//! - Deterministic: the same text and model ID always produce the same count.
//! - Total: counting never fails for any text; empty text yields zero.
//! - Fallback: a model with no dedicated encoding degrades to the fixed
//!   generic encoding, never to an error.
//!
//! ## NOT Responsible For
//! - Cost arithmetic (that belongs to `cost`)
//! - Routing thresholds (that belongs to `routing`)
//! - The BPE mechanics themselves (delegated to `tiktoken-rs`)

use std::sync::Arc;

use dashmap::DashMap;
use tiktoken_rs::CoreBPE;

use crate::GatewayError;

/// External token-counting capability, keyed by model identifier.
///
/// Implementations must be thread-safe (`Send + Sync`) and stateless with
/// respect to requests — the same inputs must always yield the same count.
pub trait TokenEncoding: Send + Sync {
    /// Count billing tokens for `text` under the encoding registered for
    /// `model_id`, falling back to a generic encoding for unknown models.
    ///
    /// Empty text yields zero. Must not fail for any non-empty text.
    fn count(&self, text: &str, model_id: &str) -> u64;

    /// Short provider name for logging and diagnostics.
    fn name(&self) -> &str;
}

/// Production encoding provider backed by `tiktoken-rs`.
///
/// Resolves the dedicated BPE for each model identifier on first use and
/// caches it; models without a dedicated encoding use the `cl100k_base`
/// generic encoding. Construction fails only if the generic encoding itself
/// cannot be built, which makes every later `count` call total.
pub struct TiktokenEncoding {
    /// The fixed generic encoding used when no model-specific BPE exists.
    fallback: Arc<CoreBPE>,
    /// Per-model BPE cache. Unknown models cache the fallback under their
    /// own key so the registry lookup runs once per model, not per request.
    by_model: DashMap<String, Arc<CoreBPE>>,
}

impl TiktokenEncoding {
    /// Build the provider, eagerly constructing the generic fallback encoding.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if the `cl100k_base` encoding
    /// cannot be constructed — without it the fallback contract cannot be
    /// honoured, so the gateway refuses to start.
    pub fn new() -> Result<Self, GatewayError> {
        let fallback = tiktoken_rs::cl100k_base()
            .map_err(|e| GatewayError::ConfigError(format!("token encoding unavailable: {e}")))?;

        Ok(Self {
            fallback: Arc::new(fallback),
            by_model: DashMap::new(),
        })
    }

    /// Return the cached BPE for `model_id`, resolving and caching on miss.
    fn bpe_for(&self, model_id: &str) -> Arc<CoreBPE> {
        if let Some(bpe) = self.by_model.get(model_id) {
            return Arc::clone(&bpe);
        }

        let resolved = match tiktoken_rs::get_bpe_from_model(model_id) {
            Ok(bpe) => Arc::new(bpe),
            Err(_) => {
                // Recoverable: unsupported model degrades to the generic
                // encoding and is never surfaced as an error.
                tracing::debug!(
                    target: "gateway::tokens",
                    model_id = %model_id,
                    "no dedicated encoding for model, using generic fallback"
                );
                Arc::clone(&self.fallback)
            }
        };

        self.by_model
            .insert(model_id.to_string(), Arc::clone(&resolved));
        resolved
    }
}

impl TokenEncoding for TiktokenEncoding {
    fn count(&self, text: &str, model_id: &str) -> u64 {
        if text.is_empty() {
            return 0;
        }
        self.bpe_for(model_id).encode_with_special_tokens(text).len() as u64
    }

    fn name(&self) -> &str {
        "tiktoken"
    }
}

/// Whitespace-word encoding for tests and demos.
///
/// Counts whitespace-delimited words regardless of model. Deterministic and
/// dependency-free, which makes threshold boundaries easy to pin in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceEncoding;

impl TokenEncoding for WhitespaceEncoding {
    fn count(&self, text: &str, _model_id: &str) -> u64 {
        text.split_whitespace().count() as u64
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}
