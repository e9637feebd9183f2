//! Resolver behavior against canned tagger output.
//!
//! Fragments are built by hand so every expectation about boxes can be
//! computed exactly.

use std::collections::HashSet;

use veil::domain::{BoundingBox, MatcherKind, TextFragment};
use veil::resolver::refine::{refine_span, RefineOptions};
use veil::resolver::UnresolvedReason;
use veil::{Resolution, Resolver};

mod common;

/// Fragments on consecutive lines, 6 points per character.
fn lines(texts: &[&str]) -> Vec<TextFragment> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let width = text.chars().count() as f64 * 6.0;
            TextFragment::new(1, *text, BoundingBox::new(72.0, 700.0 - 14.0 * i as f64, width, 12.0))
        })
        .collect()
}

fn raw_text(fragments: &[TextFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn assert_no_double_claim(resolution: &Resolution) {
    let mut seen = HashSet::new();
    for record in &resolution.records {
        let kind = MatcherKind::classify(record.label.trim_end_matches("_FALLBACK"));
        let keys: HashSet<_> = record.bounding_boxes.iter().map(|b| b.source_key()).collect();
        for key in keys {
            assert!(
                seen.insert((key, kind)),
                "fragment at {:?} claimed twice for {:?}",
                key,
                kind
            );
        }
    }
}

#[test]
fn test_round_trip_scenario() {
    let fragments = lines(&["Contact Jane Doe at", "jane@x.com", "or 555-123-4567."]);
    let raw = raw_text(&fragments);
    let tagged = "Contact <NAME> at\n<EMAIL>\nor <PHONE NUMBER>.";

    let resolution = Resolver::new().resolve(&fragments, tagged, &raw);

    assert_eq!(resolution.records.len(), 3);
    assert!(resolution.unresolved.is_empty());
    for record in &resolution.records {
        assert_eq!(record.bounding_boxes.len(), 1, "{}", record.tag);
    }

    let email = &resolution.records[1];
    assert_eq!(email.tag, "<EMAIL>");
    assert_eq!(email.bounding_boxes[0].text, "jane@x.com");
    assert_eq!(email.original_value.as_deref(), Some("jane@x.com"));

    let name = &resolution.records[0];
    assert_eq!(name.original_value.as_deref(), Some("Jane Doe"));
    assert_eq!(name.bounding_boxes[0].matched_text.as_deref(), Some("Jane Doe"));
}

#[test]
fn test_refined_boxes_cover_matched_text() {
    let fragments = lines(&["Contact Jane Doe at", "jane@x.com", "or 555-123-4567."]);
    let raw = raw_text(&fragments);
    let resolution = Resolver::new().resolve(&fragments, "Contact <NAME> at\n<EMAIL>\nor <PHONE NUMBER>.", &raw);

    for refined in resolution.records.iter().flat_map(|r| &r.bounding_boxes) {
        let fragment = fragments
            .iter()
            .find(|f| f.key() == refined.source_key())
            .expect("box should come from a fragment");
        let matched = refined.matched_text.as_deref().expect("value should be located");
        let offset = fragment.text[..fragment.text.find(matched).unwrap()].chars().count() as f64;
        let len = matched.chars().count() as f64;

        assert!(fragment.bbox.contains(&refined.bbox));
        assert!(refined.bbox.x <= fragment.bbox.x + offset * 6.0);
        assert!(refined.bbox.right() >= fragment.bbox.x + (offset + len) * 6.0);
    }
}

#[test]
fn test_fallback_catches_missed_value() {
    let fragments = lines(&["Call 555-123-4567", "Alt 555-987-6543"]);
    let raw = raw_text(&fragments);
    let tagged = "Call <PHONE>\nAlt 555-987-6543";

    let resolution = Resolver::new().resolve(&fragments, tagged, &raw);

    assert_eq!(resolution.records.len(), 2);
    let tagged_record = &resolution.records[0];
    assert_eq!(tagged_record.bounding_boxes.len(), 1);
    assert_eq!(tagged_record.bounding_boxes[0].text, "Call 555-123-4567");

    let fallback = &resolution.records[1];
    assert_eq!(fallback.label, "PHONE_FALLBACK");
    assert!(fallback.is_fallback());
    assert_eq!(fallback.bounding_boxes.len(), 1);
    assert_eq!(fallback.bounding_boxes[0].text, "Alt 555-987-6543");
    assert_no_double_claim(&resolution);
}

#[test]
fn test_same_typed_tags_claim_their_own_fragments() {
    let fragments = lines(&["Cell 555-123-4567", "Home 555-987-6543"]);
    let raw = raw_text(&fragments);
    let tagged = "Cell <PHONE>\nHome <PHONE>";

    let resolution = Resolver::new().resolve(&fragments, tagged, &raw);

    assert_eq!(resolution.records.len(), 2);
    assert_eq!(resolution.records[0].bounding_boxes[0].text, "Cell 555-123-4567");
    assert_eq!(resolution.records[1].bounding_boxes[0].text, "Home 555-987-6543");
    assert_eq!(
        resolution.records[1].original_value.as_deref(),
        Some("555-987-6543")
    );
    assert_no_double_claim(&resolution);
}

#[test]
fn test_first_valueless_tag_takes_every_match() {
    let fragments = lines(&["Cell 555-123-4567", "Home 555-987-6543"]);
    let raw = raw_text(&fragments);
    // The tagger rewrote the text, so no literal can be recovered.
    let tagged = "Numbers: <PHONE>, <PHONE>";

    let resolution = Resolver::new().resolve(&fragments, tagged, &raw);

    assert_eq!(resolution.records[0].bounding_boxes.len(), 2);
    assert_eq!(resolution.records[0].original_value.as_deref(), Some("phone number"));
    assert!(resolution.records[1].bounding_boxes.is_empty());
    assert_eq!(resolution.unresolved.len(), 1);
    assert_eq!(resolution.unresolved[0].reason, UnresolvedReason::NoCandidates);
    assert_no_double_claim(&resolution);
}

#[test]
fn test_untagged_text_runs_fallback_only() {
    let fragments = lines(&["Jane Doe", "jane@x.com", "SSN 123-45-6789"]);
    let raw = raw_text(&fragments);

    let resolution = Resolver::new().resolve(&fragments, &raw, &raw);

    let labels: Vec<_> = resolution.records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["EMAIL_FALLBACK", "SSN_FALLBACK"]);
    assert!(resolution.records.iter().all(|r| r.is_fallback()));
    assert_eq!(resolution.records[0].original_value.as_deref(), Some("Email addresses"));
}

#[test]
fn test_fallback_can_be_disabled() {
    let fragments = lines(&["Alt 555-987-6543"]);
    let raw = raw_text(&fragments);
    let resolution = Resolver::new().with_fallback_scan(false).resolve(&fragments, &raw, &raw);
    assert!(resolution.records.is_empty());
}

#[test]
fn test_different_types_may_share_a_fragment() {
    let fragments = lines(&["jane@x.com / 555-123-4567"]);
    let raw = raw_text(&fragments);

    let resolution = Resolver::new().resolve(&fragments, "<EMAIL> / <PHONE>", &raw);

    assert_eq!(resolution.records.len(), 2);
    let email = &resolution.records[0].bounding_boxes[0];
    let phone = &resolution.records[1].bounding_boxes[0];
    assert_eq!(email.source_key(), phone.source_key());
    assert!(email.bbox.right() <= phone.bbox.x + 6.0 * 2.0);
}

#[test]
fn test_padding_direction() {
    let fragment = TextFragment::new(1, "Tel: 555-1234", BoundingBox::new(100.0, 200.0, 80.0, 10.0));

    let refined = refine_span(&fragment, 5..13, RefineOptions::default());

    assert!(refined.bbox.x > 100.0 && refined.bbox.x < 180.0);
    assert!(refined.bbox.width < 80.0);
    assert!(refined.bbox.right() <= 180.0 + 1e-9);
    assert_eq!(refined.bbox.y, 200.0);
    assert_eq!(refined.bbox.height, 10.0);
}

#[test]
fn test_unknown_label_needs_review() {
    let fragments = lines(&["GPA: 3.9"]);
    let raw = raw_text(&fragments);

    let resolution = Resolver::new().resolve(&fragments, "GPA: <GPA>", &raw);

    assert_eq!(resolution.records.len(), 1);
    assert!(resolution.records[0].bounding_boxes.is_empty());
    assert_eq!(resolution.unresolved[0].reason, UnresolvedReason::UnknownType);
}
