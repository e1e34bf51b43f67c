//! Per-batch rollup statistics.

use crate::insights::{AggregatedInsight, Summary};

/// Counts insights by category and severity and averages their confidence.
#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder;

impl SummaryBuilder {
    /// Summarise the insights that survived filtering and truncation.
    pub fn build(insights: &[AggregatedInsight]) -> Summary {
        let mut summary = Summary {
            total_insights: insights.len(),
            ..Default::default()
        };

        let mut confidence_sum = 0.0;
        for insight in insights {
            *summary.by_category.entry(insight.category).or_default() += 1;
            *summary.by_severity.entry(insight.severity).or_default() += 1;
            if insight.is_alert {
                summary.alerts_count += 1;
            }
            confidence_sum += insight.confidence;
        }

        if !insights.is_empty() {
            summary.overall_confidence = confidence_sum / insights.len() as f64;
        }

        summary
    }
}
