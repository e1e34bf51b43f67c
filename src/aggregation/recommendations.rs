//! Interviewer recommendations and overall risk assessment.

use chrono::Utc;

use crate::insights::{
    AggregatedInsight, Assessment, Category, Recommendation, RecommendationKind, RiskLevel,
    Severity,
};

const IDENTITY_ACTIONS: [&str; 3] = [
    "Ask the candidate to show their ID",
    "Request they pan the camera around the room",
    "Ask a question only they would know from their application",
];

const CLARIFICATION_FALLBACK: [&str; 2] = [
    "Can you elaborate on that?",
    "Can you walk me through a specific example?",
];

const HESITATION_DESCRIPTION: &str =
    "The candidate appears hesitant. This could indicate uncertainty or nervousness.";

const HESITATION_ACTIONS: [&str; 2] = [
    "Consider asking for more specific examples",
    "Give the candidate time to think before answering",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Maps alerted insights to action suggestions.
#[derive(Debug, Clone)]
pub struct RecommendationGenerator {
    max_per_round: usize,
}

impl RecommendationGenerator {
    pub fn new(max_per_round: usize) -> Self {
        Self { max_per_round }
    }

    /// Recommendations for the alerted insights, in insight order, capped.
    pub fn generate(&self, insights: &[AggregatedInsight]) -> Vec<Recommendation> {
        insights
            .iter()
            .filter(|i| i.is_alert)
            .filter_map(recommend)
            .take(self.max_per_round)
            .collect()
    }
}

fn recommend(insight: &AggregatedInsight) -> Option<Recommendation> {
    match insight.category {
        Category::Fraud => Some(Recommendation {
            kind: RecommendationKind::Action,
            priority: Severity::High,
            title: "Verify Candidate Identity".to_string(),
            description: format!(
                "Based on {}, consider verifying the candidate's identity.",
                insight.insight_type
            ),
            suggested_actions: owned(&IDENTITY_ACTIONS),
            suggested_questions: Vec::new(),
            related_insight_id: insight.id.clone(),
        }),
        Category::Contradiction => Some(Recommendation {
            kind: RecommendationKind::Clarification,
            priority: Severity::Medium,
            title: "Clarify Resume Claim".to_string(),
            description: insight.description.clone(),
            suggested_actions: Vec::new(),
            suggested_questions: if insight.followup_questions.is_empty() {
                owned(&CLARIFICATION_FALLBACK)
            } else {
                insight.followup_questions.clone()
            },
            related_insight_id: insight.id.clone(),
        }),
        Category::Speech if insight.insight_type == "high_hesitation" => Some(Recommendation {
            kind: RecommendationKind::Observation,
            priority: Severity::Low,
            title: "Candidate Hesitation Noted".to_string(),
            description: HESITATION_DESCRIPTION.to_string(),
            suggested_actions: owned(&HESITATION_ACTIONS),
            suggested_questions: Vec::new(),
            related_insight_id: insight.id.clone(),
        }),
        _ => None,
    }
}

/// Rolls alerted insights up into an interview-level risk assessment.
#[derive(Debug, Clone, Default)]
pub struct AssessmentBuilder;

impl AssessmentBuilder {
    pub fn assess(
        session_id: &str,
        insights: &[AggregatedInsight],
        duration_minutes: u32,
    ) -> Assessment {
        let alerted = |category: Category| {
            insights
                .iter()
                .filter(|i| i.is_alert && i.category == category)
                .count()
        };
        let fraud_indicators = alerted(Category::Fraud);
        let contradictions_found = alerted(Category::Contradiction);

        let (risk_level, risk_explanation) = if fraud_indicators >= 2 {
            (
                RiskLevel::High,
                "Multiple fraud indicators detected. Strong recommendation to verify identity.",
            )
        } else if fraud_indicators == 1 || contradictions_found >= 2 {
            (
                RiskLevel::Medium,
                "Some concerns detected. Consider probing specific areas.",
            )
        } else {
            (RiskLevel::Low, "No significant concerns detected so far.")
        };

        let mut next_steps = Vec::new();
        if fraud_indicators > 0 {
            next_steps.push("Verify candidate identity before proceeding".to_string());
        }
        if contradictions_found > 0 {
            next_steps.push("Clarify discrepancies in experience claims".to_string());
        }
        if next_steps.is_empty() {
            next_steps.push("Continue with planned interview questions".to_string());
        }

        Assessment {
            session_id: session_id.to_string(),
            interview_duration_minutes: duration_minutes,
            risk_level,
            risk_explanation: risk_explanation.to_string(),
            fraud_indicators,
            contradictions_found,
            total_insights: insights.len(),
            next_steps,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alerted(id: &str, category: Category, insight_type: &str) -> AggregatedInsight {
        AggregatedInsight {
            id: id.to_string(),
            session_id: "r1".to_string(),
            category,
            insight_type: insight_type.to_string(),
            confidence: 0.9,
            severity: Severity::High,
            title: "t".to_string(),
            description: "Claimed lead role, described a support role".to_string(),
            evidence: Vec::new(),
            source_services: Vec::new(),
            followup_questions: Vec::new(),
            is_alert: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_fraud_recommendation() {
        let generator = RecommendationGenerator::new(5);
        let recs = generator.generate(&[alerted("r1-1", Category::Fraud, "face_switch")]);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::Action);
        assert_eq!(recs[0].priority, Severity::High);
        assert_eq!(recs[0].suggested_actions.len(), 3);
        assert_eq!(recs[0].related_insight_id, "r1-1");
        assert!(recs[0].description.contains("face_switch"));
    }

    #[test]
    fn test_contradiction_uses_followups_or_fallback() {
        let generator = RecommendationGenerator::new(5);
        let mut with_questions = alerted("r1-1", Category::Contradiction, "contradiction");
        with_questions.followup_questions = vec!["Who led the migration?".to_string()];
        let without = alerted("r1-2", Category::Contradiction, "skill_mismatch");

        let recs = generator.generate(&[with_questions, without]);

        assert_eq!(recs[0].kind, RecommendationKind::Clarification);
        assert_eq!(recs[0].suggested_questions, vec!["Who led the migration?"]);
        assert_eq!(recs[0].description, "Claimed lead role, described a support role");
        assert_eq!(recs[1].suggested_questions.len(), 2);
    }

    #[test]
    fn test_only_hesitation_speech_is_recommended() {
        let generator = RecommendationGenerator::new(5);
        let recs = generator.generate(&[
            alerted("r1-1", Category::Speech, "high_hesitation"),
            alerted("r1-2", Category::Speech, "low_confidence"),
            alerted("r1-3", Category::Video, "head_movement"),
        ]);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::Observation);
        assert_eq!(recs[0].priority, Severity::Low);
        assert_eq!(recs[0].description, HESITATION_DESCRIPTION);
        assert_eq!(recs[0].suggested_actions.len(), 2);
    }

    #[test]
    fn test_non_alerts_skipped_and_cap_applied() {
        let generator = RecommendationGenerator::new(2);
        let mut quiet = alerted("r1-0", Category::Fraud, "multiple_faces");
        quiet.is_alert = false;
        let insights = vec![
            quiet,
            alerted("r1-1", Category::Fraud, "multiple_faces"),
            alerted("r1-2", Category::Fraud, "face_switch"),
            alerted("r1-3", Category::Fraud, "background_voice"),
        ];

        let recs = generator.generate(&insights);
        let ids: Vec<_> = recs.iter().map(|r| r.related_insight_id.as_str()).collect();
        assert_eq!(ids, vec!["r1-1", "r1-2"]);
    }

    #[test]
    fn test_assessment_risk_levels() {
        let low = AssessmentBuilder::assess("r1", &[], 10);
        assert_eq!(low.risk_level, RiskLevel::Low);
        assert_eq!(low.next_steps, vec!["Continue with planned interview questions"]);

        let medium = AssessmentBuilder::assess(
            "r1",
            &[
                alerted("r1-1", Category::Contradiction, "contradiction"),
                alerted("r1-2", Category::Contradiction, "skill_mismatch"),
            ],
            20,
        );
        assert_eq!(medium.risk_level, RiskLevel::Medium);
        assert_eq!(medium.contradictions_found, 2);
        assert_eq!(
            medium.next_steps,
            vec!["Clarify discrepancies in experience claims"]
        );

        let high = AssessmentBuilder::assess(
            "r1",
            &[
                alerted("r1-1", Category::Fraud, "multiple_faces"),
                alerted("r1-2", Category::Fraud, "face_switch"),
            ],
            30,
        );
        assert_eq!(high.risk_level, RiskLevel::High);
        assert_eq!(high.fraud_indicators, 2);
        assert_eq!(high.interview_duration_minutes, 30);
    }

    #[test]
    fn test_assessment_ignores_unalerted() {
        let mut quiet = alerted("r1-1", Category::Fraud, "multiple_faces");
        quiet.is_alert = false;

        let assessment = AssessmentBuilder::assess("r1", &[quiet], 5);
        assert_eq!(assessment.fraud_indicators, 0);
        assert_eq!(assessment.total_insights, 1);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }
}
