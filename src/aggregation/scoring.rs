//! Scoring of one (category, type) group into an aggregated insight.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::grouping::InsightGroup;
use crate::insights::{AggregatedInsight, Category, Severity};

/// Maximum evidence strings kept per aggregated insight.
pub const MAX_EVIDENCE: usize = 5;
/// Maximum follow-up questions kept per aggregated insight.
pub const MAX_FOLLOWUP_QUESTIONS: usize = 3;
/// Confidence multiplier when more than one producer agrees.
pub const MULTI_SOURCE_BOOST: f64 = 1.1;

/// Builds [`AggregatedInsight`]s from grouped raw records.
#[derive(Debug, Clone, Default)]
pub struct Scorer;

impl Scorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a group. Returns `None` for an empty group.
    pub fn score(
        &self,
        id: String,
        session_id: &str,
        group: &InsightGroup<'_>,
        now: DateTime<Utc>,
    ) -> Option<AggregatedInsight> {
        if group.is_empty() {
            return None;
        }
        let count = group.len() as f64;

        let source_services = distinct(group.records.iter().map(|r| r.source.clone()));

        let mut confidence =
            group.records.iter().map(|r| r.data.confidence()).sum::<f64>() / count;
        if source_services.len() > 1 {
            confidence *= MULTI_SOURCE_BOOST;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let severity_avg = group
            .records
            .iter()
            .map(|r| r.data.severity().weight() as f64)
            .sum::<f64>()
            / count;
        let severity = Severity::from_average(severity_avg);

        let evidence = dedup_capped(
            group.records.iter().flat_map(|r| {
                r.data
                    .description()
                    .map(str::to_string)
                    .into_iter()
                    .chain(r.data.evidence())
            }),
            MAX_EVIDENCE,
        );

        let followup_questions = dedup_capped(
            group.records.iter().flat_map(|r| r.data.followup_questions()),
            MAX_FOLLOWUP_QUESTIONS,
        );

        let description = group
            .records
            .iter()
            .find_map(|r| r.data.description())
            .map(str::to_string)
            .unwrap_or_else(|| default_description(group.category, group.insight_type));

        Some(AggregatedInsight {
            id,
            session_id: session_id.to_string(),
            category: group.category,
            insight_type: group.insight_type.to_string(),
            confidence,
            severity,
            title: title_for(group.category, group.insight_type),
            description,
            evidence,
            source_services,
            followup_questions,
            is_alert: false,
            timestamp: now,
        })
    }
}

/// Stable dedup preserving first-seen order, truncated to `cap`.
fn dedup_capped(items: impl IntoIterator<Item = String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .take(cap)
        .collect()
}

fn distinct(items: impl IntoIterator<Item = String>) -> Vec<String> {
    dedup_capped(items, usize::MAX)
}

// ============================================================================
// Title / description catalog
// ============================================================================

/// Display title for a (category, type) pair.
pub fn title_for(category: Category, insight_type: &str) -> String {
    let known = match (category, insight_type) {
        (Category::Fraud, "multiple_faces") => Some("Multiple Faces Detected"),
        (Category::Fraud, "face_switch") => Some("Face Switch Detected"),
        (Category::Fraud, "background_voice") => Some("Background Voice Detected"),
        (Category::Contradiction, "contradiction") => Some("Resume Contradiction Found"),
        (Category::Contradiction, "skill_mismatch") => Some("Skill Level Mismatch"),
        (Category::Speech, "low_confidence") => Some("Low Speaking Confidence"),
        (Category::Speech, "high_hesitation") => Some("High Hesitation Detected"),
        (Category::Video, "head_movement") => Some("Unusual Head Movement"),
        (Category::Video, "low_quality") => Some("Video Quality Issue"),
        _ => None,
    };

    match known {
        Some(title) => title.to_string(),
        None => format!(
            "{}: {}",
            title_case(category.as_str()),
            title_case(&insight_type.replace('_', " "))
        ),
    }
}

/// Template description used when no producer supplied one.
pub fn default_description(category: Category, insight_type: &str) -> String {
    let known = match (category, insight_type) {
        (Category::Fraud, "multiple_faces") => Some(
            "Multiple people detected in the candidate's video feed. This may indicate someone else is present during the interview.",
        ),
        (Category::Fraud, "face_switch") => Some(
            "The face in the video appears to have changed from the original candidate. Identity verification recommended.",
        ),
        (Category::Fraud, "background_voice") => Some(
            "Additional voices detected in the audio that may indicate coaching or assistance.",
        ),
        (Category::Contradiction, "contradiction") => {
            Some("The candidate's statement contradicts information on their resume.")
        }
        (Category::Contradiction, "skill_mismatch") => Some(
            "The candidate's demonstrated knowledge doesn't match the expertise level claimed on their resume.",
        ),
        (Category::Speech, "low_confidence") => Some(
            "Speech analysis indicates the candidate may be uncertain about their response.",
        ),
        (Category::Speech, "high_hesitation") => {
            Some("Frequent pauses and filler words detected in the candidate's response.")
        }
        (Category::Video, "head_movement") => {
            Some("Candidate is looking away from the camera frequently.")
        }
        (Category::Video, "low_quality") => {
            Some("Video quality is degraded, which may affect analysis accuracy.")
        }
        _ => None,
    };

    known
        .map(str::to_string)
        .unwrap_or_else(|| format!("Observation in {}: {}", category, insight_type))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::grouping::group_insights;
    use crate::insights::{InsightData, RawInsight};
    use serde_json::json;

    fn raw(source: &str, kind: &str, data: serde_json::Value) -> RawInsight {
        RawInsight::new(
            "r1",
            source,
            kind,
            serde_json::from_value(data).expect("valid data"),
        )
    }

    fn score_all(records: &[RawInsight]) -> Vec<AggregatedInsight> {
        let scorer = Scorer::new();
        group_insights(records)
            .iter()
            .enumerate()
            .filter_map(|(n, g)| scorer.score(format!("r1-{}", n + 1), "r1", g, Utc::now()))
            .collect()
    }

    #[test]
    fn test_confidence_is_mean_of_group() {
        let records = vec![
            raw("nlp-engine", "contradiction", json!({"confidence": 0.6})),
            raw("nlp-engine", "contradiction", json!({"confidence": 0.9})),
            raw("nlp-engine", "contradiction", json!({"confidence": 0.75})),
        ];

        let insight = &score_all(&records)[0];
        assert!((insight.confidence - 0.75).abs() < 1e-9);
        assert_eq!(insight.source_services, vec!["nlp-engine"]);
    }

    #[test]
    fn test_missing_confidence_defaults_to_half() {
        let records = vec![
            raw("speech-analysis", "low_confidence", json!({})),
            raw("speech-analysis", "low_confidence", json!({"confidence": 0.7})),
        ];

        let insight = &score_all(&records)[0];
        assert!((insight.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_multi_source_boost() {
        let records = vec![
            raw("fraud-detection", "multiple_faces", json!({"confidence": 0.7})),
            raw("fraud-detection", "multiple_faces", json!({"confidence": 0.9})),
        ];
        let boosted = vec![
            raw("fraud-detection", "multiple_faces", json!({"confidence": 0.7})),
            raw("video-analysis", "multiple_faces", json!({"confidence": 0.9})),
        ];

        let single = &score_all(&records)[0];
        let multi = &score_all(&boosted)[0];
        assert!((single.confidence - 0.8).abs() < 1e-9);
        assert!((multi.confidence - 0.88).abs() < 1e-9);
        assert_eq!(multi.category, Category::Fraud);
        assert_eq!(multi.source_services, vec!["fraud-detection", "video-analysis"]);
    }

    #[test]
    fn test_confidence_clamped_to_one() {
        let records = vec![
            raw("gaze-tracker", "looking_away", json!({"confidence": 0.95})),
            raw("eye-tracker", "looking_away", json!({"confidence": 1.0})),
        ];
        assert_eq!(score_all(&records)[0].confidence, 1.0);

        let overreported = vec![raw("gaze-tracker", "x", json!({"confidence": 3.0}))];
        assert_eq!(score_all(&overreported)[0].confidence, 1.0);
    }

    #[test]
    fn test_severity_aggregation() {
        let records = vec![
            raw("video-analysis", "head_movement", json!({"severity": "high"})),
            raw("video-analysis", "head_movement", json!({"severity": "medium"})),
            raw("video-analysis", "head_movement", json!({"severity": "high"})),
        ];
        // (3 + 2 + 3) / 3 = 2.67
        assert_eq!(score_all(&records)[0].severity, Severity::High);

        let records = vec![
            raw("video-analysis", "head_movement", json!({"severity": "high"})),
            raw("video-analysis", "head_movement", json!({})),
        ];
        // (3 + 1) / 2 = 2.0
        assert_eq!(score_all(&records)[0].severity, Severity::Medium);
    }

    #[test]
    fn test_evidence_capped_and_deduplicated() {
        let records = vec![
            raw(
                "fraud-detection",
                "face_switch",
                json!({"evidence": ["e1", "e2", "e3", "e1"]}),
            ),
            raw(
                "fraud-detection",
                "face_switch",
                json!({"evidence": ["e4", "e2", "e5", "e6", "e7", "e8"]}),
            ),
        ];

        let insight = &score_all(&records)[0];
        assert_eq!(insight.evidence, vec!["e1", "e2", "e3", "e4", "e5"]);
    }

    #[test]
    fn test_description_leads_evidence() {
        let records = vec![raw(
            "nlp-engine",
            "contradiction",
            json!({"description": "Claimed 5 years of Rust", "evidence": ["resume line 4"]}),
        )];

        let insight = &score_all(&records)[0];
        assert_eq!(
            insight.evidence,
            vec!["Claimed 5 years of Rust", "resume line 4"]
        );
        assert_eq!(insight.description, "Claimed 5 years of Rust");
    }

    #[test]
    fn test_followup_questions_capped() {
        let records = vec![
            raw(
                "nlp-engine",
                "skill_mismatch",
                json!({"followup_questions": ["q1", "q2"]}),
            ),
            raw(
                "nlp-engine",
                "skill_mismatch",
                json!({"followup_questions": ["q2", "q3", "q4"]}),
            ),
        ];

        let insight = &score_all(&records)[0];
        assert_eq!(insight.followup_questions, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn test_first_description_wins() {
        let records = vec![
            raw("nlp-engine", "contradiction", json!({"description": ""})),
            raw("nlp-engine", "contradiction", json!({"description": "second"})),
            raw("nlp-engine", "contradiction", json!({"description": "third"})),
        ];

        assert_eq!(score_all(&records)[0].description, "second");
    }

    #[test]
    fn test_template_title_and_description() {
        let records = vec![raw("fraud-detection", "multiple_faces", json!({}))];
        let insight = &score_all(&records)[0];

        assert_eq!(insight.title, "Multiple Faces Detected");
        assert!(insight.description.starts_with("Multiple people detected"));
    }

    #[test]
    fn test_fallback_title_and_description() {
        assert_eq!(
            title_for(Category::Other, "looking_away"),
            "Other: Looking Away"
        );
        assert_eq!(
            default_description(Category::Video, "glare"),
            "Observation in video: glare"
        );
    }

    #[test]
    fn test_empty_group_scores_nothing() {
        let group = InsightGroup {
            category: Category::Speech,
            insight_type: "low_confidence",
            records: Vec::new(),
        };
        assert!(Scorer::new()
            .score("r1-1".to_string(), "r1", &group, Utc::now())
            .is_none());
    }

    #[test]
    fn test_data_builder_integration() {
        let records = vec![RawInsight::new(
            "r1",
            "speech-analysis",
            "high_hesitation",
            InsightData::new().with("confidence", 0.8).with("severity", "medium"),
        )];
        let insight = &score_all(&records)[0];

        assert_eq!(insight.id, "r1-1");
        assert_eq!(insight.category, Category::Speech);
        assert_eq!(insight.severity, Severity::Medium);
        assert!(!insight.is_alert);
    }
}
