//! Unit tests for the insight data model.
//!
//! Covers category mapping, severity bucketing, the payload defaulting rules
//! and the wire shape of batches.

use super::*;
use serde_json::json;

// ============================================================================
// Category tests
// ============================================================================

#[test]
fn test_category_from_source() {
    assert_eq!(Category::from_source("speech-analysis"), Category::Speech);
    assert_eq!(Category::from_source("video-analysis"), Category::Video);
    assert_eq!(Category::from_source("fraud-detection"), Category::Fraud);
    assert_eq!(Category::from_source("nlp-engine"), Category::Contradiction);
    assert_eq!(Category::from_source("gaze-tracker"), Category::Other);
}

#[test]
fn test_category_resolve() {
    assert_eq!(
        Category::resolve("video-analysis", "multiple_faces", None),
        Category::Fraud
    );
    assert_eq!(
        Category::resolve("speech-analysis", "background_voice", None),
        Category::Fraud
    );
    assert_eq!(
        Category::resolve("video-analysis", "head_movement", None),
        Category::Video
    );
    assert_eq!(
        Category::resolve("video-analysis", "head_movement", Some(Category::Other)),
        Category::Other
    );
}

#[test]
fn test_category_priority_order() {
    assert!(Category::Fraud.priority() < Category::Contradiction.priority());
    assert!(Category::Contradiction.priority() < Category::Speech.priority());
    assert!(Category::Speech.priority() < Category::Video.priority());
    assert_eq!(Category::Other.priority(), 99);
}

#[test]
fn test_category_round_trip_str() {
    for category in [
        Category::Fraud,
        Category::Contradiction,
        Category::Speech,
        Category::Video,
        Category::Other,
    ] {
        assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
    }
    assert!("bogus".parse::<Category>().is_err());
}

// ============================================================================
// Severity tests
// ============================================================================

#[test]
fn test_severity_from_average_thresholds() {
    assert_eq!(Severity::from_average(3.0), Severity::High);
    assert_eq!(Severity::from_average(2.5), Severity::High);
    assert_eq!(Severity::from_average(2.49), Severity::Medium);
    assert_eq!(Severity::from_average(1.5), Severity::Medium);
    assert_eq!(Severity::from_average(1.49), Severity::Low);
    assert_eq!(Severity::from_average(1.0), Severity::Low);
}

#[test]
fn test_severity_from_reported_is_lenient() {
    assert_eq!(Severity::from_reported("HIGH"), Severity::High);
    assert_eq!(Severity::from_reported("medium"), Severity::Medium);
    assert_eq!(Severity::from_reported("critical"), Severity::Low);
}

// ============================================================================
// InsightData tests
// ============================================================================

#[test]
fn test_data_defaults_when_empty() {
    let data = InsightData::new();
    assert_eq!(data.confidence(), DEFAULT_CONFIDENCE);
    assert_eq!(data.severity(), Severity::Low);
    assert!(data.description().is_none());
    assert!(data.evidence().is_empty());
    assert!(data.followup_questions().is_empty());
}

#[test]
fn test_data_typed_accessors() {
    let data: InsightData = serde_json::from_value(json!({
        "confidence": 0.92,
        "severity": "high",
        "description": "Two faces in frame",
        "evidence": ["frame 120", 7, "frame 121"],
        "followup_questions": ["Is someone with you?"]
    }))
    .unwrap();

    assert_eq!(data.confidence(), 0.92);
    assert_eq!(data.severity(), Severity::High);
    assert_eq!(data.description(), Some("Two faces in frame"));
    assert_eq!(data.evidence(), vec!["frame 120", "frame 121"]);
    assert_eq!(data.followup_questions(), vec!["Is someone with you?"]);
}

#[test]
fn test_data_non_numeric_confidence_defaults() {
    let data = InsightData::new().with("confidence", "very");
    assert_eq!(data.confidence(), DEFAULT_CONFIDENCE);
}

#[test]
fn test_data_empty_description_is_none() {
    let data = InsightData::new().with("description", "");
    assert!(data.description().is_none());
}

// ============================================================================
// RawInsight tests
// ============================================================================

#[test]
fn test_raw_insight_wire_shape() {
    let raw = RawInsight::new(
        "r1",
        "fraud-detection",
        "multiple_faces",
        InsightData::new().with("confidence", 0.9),
    );
    let value = serde_json::to_value(&raw).unwrap();

    assert_eq!(value["session_id"], "r1");
    assert_eq!(value["type"], "multiple_faces");
    assert_eq!(value["data"]["confidence"], 0.9);
    assert_eq!(raw.category(), Category::Fraud);
    assert!(value.get("category").is_none());

    let tagged = RawInsight::new("r1", "gaze-tracker", "looking_away", InsightData::new())
        .with_category(Category::Video);
    assert_eq!(tagged.category(), Category::Video);
}

// ============================================================================
// Batch tests
// ============================================================================

#[test]
fn test_empty_batch() {
    let batch = InsightBatch::empty("r9");
    assert_eq!(batch.session_id, "r9");
    assert!(batch.insights.is_empty());
    assert_eq!(batch.summary.total_insights, 0);
    assert_eq!(batch.alerts().count(), 0);
}

#[test]
fn test_summary_serializes_category_keys_as_strings() {
    let mut summary = Summary::default();
    summary.by_category.insert(Category::Fraud, 2);
    summary.by_severity.insert(Severity::High, 1);

    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["by_category"]["fraud"], 2);
    assert_eq!(value["by_severity"]["high"], 1);
}

#[test]
fn test_recommendation_omits_empty_lists() {
    let rec = Recommendation {
        kind: RecommendationKind::Observation,
        priority: Severity::Low,
        title: "Noted".to_string(),
        description: "desc".to_string(),
        suggested_actions: Vec::new(),
        suggested_questions: Vec::new(),
        related_insight_id: "r1-1".to_string(),
    };
    let value = serde_json::to_value(&rec).unwrap();

    assert_eq!(value["type"], "observation");
    assert_eq!(value["priority"], "low");
    assert!(value.get("suggested_actions").is_none());
    assert!(value.get("suggested_questions").is_none());
}
