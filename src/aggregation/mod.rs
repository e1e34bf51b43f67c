//! Aggregation pipeline.
//!
//! Raw insights are buffered per session in a [`RoundBuffer`], grouped by
//! (category, type), scored by the [`Scorer`], filtered, sorted and capped,
//! gated through the [`AlertGate`], and packaged with recommendations and a
//! summary by the [`AggregationEngine`].

mod alerts;
mod buffer;
mod engine;
mod grouping;
mod recommendations;
mod scoring;
mod summary;

pub use alerts::{AlertGate, AlertKey, HIGH_SEVERITY_ALERT_CONFIDENCE};
pub use buffer::RoundBuffer;
pub use engine::AggregationEngine;
pub use grouping::{group_insights, InsightGroup};
pub use recommendations::{AssessmentBuilder, RecommendationGenerator};
pub use scoring::{
    default_description, title_for, Scorer, MAX_EVIDENCE, MAX_FOLLOWUP_QUESTIONS,
    MULTI_SOURCE_BOOST,
};
pub use summary::SummaryBuilder;
