//! Compliance guardrail validation suite.
//!
//! Exercises the scanner and redactor together across every entity
//! category, with the redaction-idempotence guarantee as the centrepiece:
//! re-scanning Strict-redacted output must never find the same categories
//! again, including when spans overlap.

use prompt_gateway::{
    pii::{redact, ComplianceMode, EntityRecognition, RegexRecognizer, REDACTION_MARKER},
    EntityCategory,
};

fn recognizer() -> RegexRecognizer {
    RegexRecognizer::new().expect("recognizer must construct")
}

/// Strict-redact `text` and return the output text.
fn strict_redact(text: &str) -> String {
    let r = recognizer();
    let findings = r.scan(text);
    redact(text, &findings, ComplianceMode::Strict).text
}

// ── Redaction idempotence, category by category ────────────────────────

#[test]
fn redacted_phone_text_scans_clean() {
    let out = strict_redact("Call me at 555-0199 or (212) 555-0134 tomorrow");
    assert!(recognizer().scan(&out).is_empty(), "residual findings in: {out}");
}

#[test]
fn redacted_email_text_scans_clean() {
    let out = strict_redact("CC jane.doe+billing@example.co.uk and bob@corp.io");
    assert!(recognizer().scan(&out).is_empty(), "residual findings in: {out}");
}

#[test]
fn redacted_card_text_scans_clean() {
    let out = strict_redact("Pay with 4111 1111 1111 1111 today");
    assert!(recognizer().scan(&out).is_empty(), "residual findings in: {out}");
}

#[test]
fn redacted_government_id_text_scans_clean() {
    let out = strict_redact("SSN 123-45-6789 on file");
    assert!(recognizer().scan(&out).is_empty(), "residual findings in: {out}");
}

#[test]
fn redacted_mixed_entity_text_scans_clean() {
    let out = strict_redact(
        "Reach Jane at 555-0199 or jane@example.com, card 4111 1111 1111 1111, SSN 123-45-6789.",
    );
    assert!(recognizer().scan(&out).is_empty(), "residual findings in: {out}");
    // Every category was present, so at least one marker must remain.
    assert!(out.contains(REDACTION_MARKER));
}

#[test]
fn double_redaction_is_a_fixed_point() {
    let once = strict_redact("Call 555-0199 now");
    let twice = strict_redact(&once);
    assert_eq!(once, twice);
}

// ── Overlap handling ───────────────────────────────────────────────────

#[test]
fn overlapping_card_and_phone_spans_leave_no_residual_digits() {
    // The card number embeds phone-shaped digit runs; the union of all
    // spans must go, not just the card span.
    let text = "card 4111 1111 1111 1111 end";
    let out = strict_redact(text);
    assert!(
        !out.chars().any(|c| c.is_ascii_digit()),
        "digits survived redaction: {out}"
    );
    assert!(out.starts_with("card "));
    assert!(out.ends_with(" end"));
}

// ── Category coverage ──────────────────────────────────────────────────

#[test]
fn scan_reports_every_category_in_kitchen_sink_text() {
    let text =
        "Phone 555-0199, email a@b.com, card 4111-1111-1111-1111, SSN 123-45-6789 all in one.";
    let findings = recognizer().scan(text);

    for category in EntityCategory::ALL {
        assert!(
            findings.iter().any(|f| f.category == category),
            "missing category {:?} in findings: {findings:?}",
            category
        );
    }
}

#[test]
fn confidences_are_within_unit_interval() {
    let findings = recognizer()
        .scan("Phone 555-0199, email a@b.com, card 4111 1111 1111 1111, SSN 123-45-6789");
    assert!(!findings.is_empty());
    for f in &findings {
        assert!(f.confidence > 0.0 && f.confidence <= 1.0);
    }
}

#[test]
fn spans_index_the_original_text() {
    let text = "Write to sales@example.org about pricing";
    let findings = recognizer().scan(text);
    for f in &findings {
        assert!(f.end <= text.len());
        assert!(text.get(f.start..f.end).is_some(), "span not on char boundary");
    }
}

// ── Mode contract ──────────────────────────────────────────────────────

#[test]
fn audit_only_never_touches_the_text() {
    let text = "Phone 555-0199 and SSN 123-45-6789";
    let r = recognizer();
    let findings = r.scan(text);
    assert!(!findings.is_empty());

    let out = redact(text, &findings, ComplianceMode::AuditOnly);
    assert_eq!(out.text, text);
    assert!(out.audit_flagged);
    assert!(!out.redacted);
}

#[test]
fn strict_flags_redaction_only_when_findings_exist() {
    let clean = "No sensitive data in this sentence";
    let r = recognizer();
    let out = redact(clean, &r.scan(clean), ComplianceMode::Strict);
    assert!(!out.redacted);
    assert_eq!(out.text, clean);
}

#[test]
fn unicode_text_around_findings_survives_redaction() {
    let text = "naïve café ☎ 555-0199 fin";
    let out = strict_redact(text);
    assert!(out.contains("naïve café"));
    assert!(out.contains(REDACTION_MARKER));
    assert!(!out.contains("555-0199"));
}
