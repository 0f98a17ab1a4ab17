//! Entity recognition.
//!
//! The [`EntityRecognition`] trait is the injectable PII-detection
//! capability; [`RegexRecognizer`] is the default implementation, built on
//! compiled patterns for the four scanned categories. Pattern compilation
//! happens once at construction so per-request scanning is allocation-light
//! and infallible.

use regex::Regex;

use super::{EntityCategory, PiiFinding};
use crate::GatewayError;

/// External PII-detection capability.
///
/// Implementations must be thread-safe (`Send + Sync`), read-only over the
/// input text, and return findings ordered by start offset ascending.
/// Overlapping findings are reported as distinct — merging is the
/// redactor's job.
pub trait EntityRecognition: Send + Sync {
    /// Scan `text` for the fixed entity-category set.
    fn scan(&self, text: &str) -> Vec<PiiFinding>;
}

// Per-category recognizer confidence. Email and validated card numbers are
// near-certain; phone patterns carry the most ambiguity.
const PHONE_CONFIDENCE: f64 = 0.75;
const EMAIL_CONFIDENCE: f64 = 0.95;
const CARD_CONFIDENCE: f64 = 0.9;
const GOVERNMENT_ID_CONFIDENCE: f64 = 0.85;

/// Default recognizer backed by compiled regex patterns.
///
/// Card candidates are additionally Luhn-checked; candidates that fail the
/// checksum are not reported.
///
/// # Panics
///
/// This type and its methods never panic.
pub struct RegexRecognizer {
    phone: Regex,
    email: Regex,
    card: Regex,
    government_id: Regex,
}

impl RegexRecognizer {
    /// Compile the category patterns.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RecognitionUnavailable`] if any pattern fails
    /// to compile. This is fatal for the gateway: it fails closed rather
    /// than forwarding unscanned text.
    pub fn new() -> Result<Self, GatewayError> {
        Ok(Self {
            phone: compile(
                r"(?:\+?1[ .-]?)?(?:\(\d{3}\)[ .-]?|\d{3}[ .-])?\d{3}[ .-]\d{4}\b",
            )?,
            email: compile(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
            card: compile(r"\b\d(?:[ -]?\d){12,18}\b")?,
            government_id: compile(r"\b\d{3}-\d{2}-\d{4}\b")?,
        })
    }
}

/// Compile one pattern, mapping failure to the fatal recognition error.
fn compile(pattern: &str) -> Result<Regex, GatewayError> {
    Regex::new(pattern).map_err(|e| GatewayError::RecognitionUnavailable(e.to_string()))
}

impl EntityRecognition for RegexRecognizer {
    fn scan(&self, text: &str) -> Vec<PiiFinding> {
        let mut findings = Vec::new();

        for m in self.phone.find_iter(text) {
            findings.push(PiiFinding {
                category: EntityCategory::Phone,
                start: m.start(),
                end: m.end(),
                confidence: PHONE_CONFIDENCE,
            });
        }

        for m in self.email.find_iter(text) {
            findings.push(PiiFinding {
                category: EntityCategory::Email,
                start: m.start(),
                end: m.end(),
                confidence: EMAIL_CONFIDENCE,
            });
        }

        for m in self.card.find_iter(text) {
            if luhn_valid(m.as_str()) {
                findings.push(PiiFinding {
                    category: EntityCategory::PaymentCard,
                    start: m.start(),
                    end: m.end(),
                    confidence: CARD_CONFIDENCE,
                });
            }
        }

        for m in self.government_id.find_iter(text) {
            findings.push(PiiFinding {
                category: EntityCategory::GovernmentId,
                start: m.start(),
                end: m.end(),
                confidence: GOVERNMENT_ID_CONFIDENCE,
            });
        }

        findings.sort_by_key(|f| (f.start, f.end));
        findings
    }
}

/// Luhn checksum over the digits of a card candidate.
///
/// Separator characters (spaces, dashes) are skipped; candidates with fewer
/// than 13 or more than 19 digits fail.
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

// ── Tests ──────────────────────────────────────────────────────────────
