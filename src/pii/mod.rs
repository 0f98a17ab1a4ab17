//! # Step: PII Guardrail
//!
//! ## Responsibility
//! Detect sensitive personal data in prompt text and, under the active
//! compliance mode, produce the text actually eligible for forwarding to an
//! external provider.
//!
//! ## Guarantees
//! - Read-only scanning: the scanner never mutates the input text.
//! - Ordered findings: findings are sorted by start offset ascending;
//!   overlapping findings are reported as distinct (the redactor merges).
//! - Fail closed: if the recognition capability cannot be constructed the
//!   gateway refuses to start rather than forwarding unscanned text.
//! - Idempotent redaction: re-scanning Strict-redacted output yields zero
//!   findings of the same categories.
//!
//! ## NOT Responsible For
//! - Audit log persistence (external collaborator invoked by the caller)
//! - Deciding the compliance mode (selected per request by the caller)

pub mod recognizer;
pub mod redactor;

// Re-exports for convenience
pub use recognizer::{EntityRecognition, RegexRecognizer};
pub use redactor::{redact, ComplianceMode, RedactionOutcome, REDACTION_MARKER};

use serde::{Deserialize, Serialize};

/// The fixed set of entity categories the gateway scans for.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Telephone number.
    Phone,
    /// Email address.
    Email,
    /// Payment-card number.
    PaymentCard,
    /// Government identification number (e.g., US SSN).
    GovernmentId,
}

impl EntityCategory {
    /// All scanned categories, in scan order.
    pub const ALL: [EntityCategory; 4] = [
        EntityCategory::Phone,
        EntityCategory::Email,
        EntityCategory::PaymentCard,
        EntityCategory::GovernmentId,
    ];

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Phone => "phone",
            EntityCategory::Email => "email",
            EntityCategory::PaymentCard => "payment_card",
            EntityCategory::GovernmentId => "government_id",
        }
    }
}

/// One detected instance of a PII category.
///
/// Offsets are byte offsets into the original text, `start` inclusive and
/// `end` exclusive, always on character boundaries.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, PartialEq)]
pub struct PiiFinding {
    /// The detected entity category.
    pub category: EntityCategory,
    /// Byte offset where the span starts (inclusive).
    pub start: usize,
    /// Byte offset where the span ends (exclusive).
    pub end: usize,
    /// Recognizer confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}
