//! Compliance redaction.
//!
//! Given the scanner's findings and the active [`ComplianceMode`], produces
//! the text actually eligible for forwarding plus the redaction and audit
//! flags. Overlapping finding spans are merged into their union before
//! substitution so the marker never leaves residual PII characters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::PiiFinding;

/// The fixed marker substituted for every redacted span.
pub const REDACTION_MARKER: &str = "<REDACTED>";

/// Per-request policy governing detected PII.
///
/// # Panics
///
/// This type never panics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceMode {
    /// Replace every finding span with [`REDACTION_MARKER`] before
    /// forwarding. The default.
    #[default]
    Strict,
    /// Forward the raw text unchanged and flag the request as a logged
    /// compliance exception. A deliberate, audited policy choice.
    AuditOnly,
}

impl ComplianceMode {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceMode::Strict => "strict",
            ComplianceMode::AuditOnly => "audit_only",
        }
    }
}

/// Result of applying the compliance policy to one request's text.
///
/// # Panics
///
/// This type never panics.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionOutcome {
    /// The text eligible for forwarding downstream.
    pub text: String,
    /// Whether any span was replaced (`Strict` with findings).
    pub redacted: bool,
    /// Whether the request is a logged compliance exception
    /// (`AuditOnly` with findings).
    pub audit_flagged: bool,
}

/// Apply the compliance policy to `text` given the scanner's findings.
///
/// - `Strict`: every finding span is replaced by [`REDACTION_MARKER`];
///   overlapping spans are merged into the union of their ranges first.
/// - `AuditOnly`: the text passes through unchanged; `audit_flagged` marks
///   the request when findings exist.
///
/// No side effects beyond the returned flags — audit logging itself is an
/// external collaborator invoked by the caller.
///
/// # Arguments
///
/// * `text` — The original prompt text.
/// * `findings` — Scanner findings over `text`, ordered by start offset.
/// * `mode` — The active compliance mode.
///
/// # Panics
///
/// This function never panics.
pub fn redact(text: &str, findings: &[PiiFinding], mode: ComplianceMode) -> RedactionOutcome {
    match mode {
        ComplianceMode::AuditOnly => RedactionOutcome {
            text: text.to_string(),
            redacted: false,
            audit_flagged: !findings.is_empty(),
        },
        ComplianceMode::Strict => {
            if findings.is_empty() {
                return RedactionOutcome {
                    text: text.to_string(),
                    redacted: false,
                    audit_flagged: false,
                };
            }

            let spans = merge_spans(text.len(), findings);
            let mut output = String::with_capacity(text.len());
            let mut cursor = 0_usize;

            for (start, end) in spans {
                if let Some(clean) = text.get(cursor..start) {
                    output.push_str(clean);
                }
                output.push_str(REDACTION_MARKER);
                cursor = end;
            }
            if let Some(tail) = text.get(cursor..) {
                output.push_str(tail);
            }

            RedactionOutcome {
                text: output,
                redacted: true,
                audit_flagged: false,
            }
        }
    }
}

/// Merge finding spans into a sorted list of disjoint ranges.
///
/// Spans are clamped to `len`, empty or inverted spans are dropped, and
/// overlapping or touching ranges collapse into their union.
fn merge_spans(len: usize, findings: &[PiiFinding]) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = findings
        .iter()
        .map(|f| (f.start.min(len), f.end.min(len)))
        .filter(|(start, end)| start < end)
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

// ── Tests ──────────────────────────────────────────────────────────────
