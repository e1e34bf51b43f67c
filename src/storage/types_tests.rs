use super::*;
use crate::insights::Category;

fn alerted() -> AggregatedInsight {
    AggregatedInsight {
        id: "r1-3".to_string(),
        session_id: "r1".to_string(),
        category: Category::Fraud,
        insight_type: "face_switch".to_string(),
        confidence: 0.93,
        severity: Severity::High,
        title: "Face Switch Detected".to_string(),
        description: "Different person in frame".to_string(),
        evidence: vec!["frame 88".to_string()],
        source_services: vec!["fraud-detection".to_string(), "video-analysis".to_string()],
        followup_questions: Vec::new(),
        is_alert: true,
        timestamp: Utc::now(),
    }
}

#[test]
fn test_stored_insight_from_insight() {
    let insight = alerted();
    let row = StoredInsight::from_insight(&insight);

    assert!(Uuid::parse_str(&row.id).is_ok());
    assert_eq!(row.insight_id, "r1-3");
    assert_eq!(row.category, Category::Fraud);
    assert_eq!(row.content.title, "Face Switch Detected");
    assert_eq!(row.content.evidence, vec!["frame 88"]);
    assert_eq!(row.source_services.len(), 2);
    assert_eq!(row.created_at, insight.timestamp);
}

#[test]
fn test_stored_rows_get_distinct_ids() {
    let insight = alerted();
    let a = StoredInsight::from_insight(&insight);
    let b = StoredInsight::from_insight(&insight);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_stored_recommendation_is_pending() {
    let rec = Recommendation {
        kind: RecommendationKind::Action,
        priority: Severity::High,
        title: "Verify Candidate Identity".to_string(),
        description: "d".to_string(),
        suggested_actions: vec!["Ask for ID".to_string()],
        suggested_questions: Vec::new(),
        related_insight_id: "r1-3".to_string(),
    };
    let row = StoredRecommendation::new("r1", &rec);

    assert_eq!(row.status, STATUS_PENDING);
    assert_eq!(row.kind, RecommendationKind::Action);
    assert_eq!(row.priority, Severity::High);
    assert_eq!(row.recommendation, rec);
}

#[test]
fn test_insight_content_serializes_flat() {
    let row = StoredInsight::from_insight(&alerted());
    let value = serde_json::to_value(&row.content).unwrap();

    assert_eq!(value["title"], "Face Switch Detected");
    assert_eq!(value["followup_questions"], serde_json::json!([]));
}
