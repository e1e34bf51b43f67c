//! Partitioning of buffered records by (category, type).

use std::collections::HashMap;

use crate::insights::{Category, RawInsight};

/// Records sharing one (category, type) key, in arrival order.
#[derive(Debug, Clone)]
pub struct InsightGroup<'a> {
    pub category: Category,
    pub insight_type: &'a str,
    pub records: Vec<&'a RawInsight>,
}

impl InsightGroup<'_> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Group records by their resolved `(category, type)`.
///
/// Groups come out in the order their key first appears.
pub fn group_insights(records: &[RawInsight]) -> Vec<InsightGroup<'_>> {
    let mut index: HashMap<(Category, &str), usize> = HashMap::new();
    let mut groups: Vec<InsightGroup<'_>> = Vec::new();

    for record in records {
        let key = (record.category(), record.insight_type.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(InsightGroup {
                category: key.0,
                insight_type: key.1,
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::InsightData;

    fn raw(source: &str, kind: &str) -> RawInsight {
        RawInsight::new("r1", source, kind, InsightData::new())
    }

    #[test]
    fn test_group_by_category_and_type() {
        let records = vec![
            raw("fraud-detection", "multiple_faces"),
            raw("speech-analysis", "low_confidence"),
            raw("fraud-detection", "multiple_faces"),
            raw("video-analysis", "multiple_faces"),
        ];

        let groups = group_insights(&records);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].category, Category::Fraud);
        assert_eq!(groups[0].insight_type, "multiple_faces");
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].category, Category::Speech);
        assert_eq!(groups[2].category, Category::Video);
    }

    #[test]
    fn test_unknown_source_maps_to_other() {
        let records = vec![raw("gaze-tracker", "looking_away")];
        let groups = group_insights(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category, Category::Other);
    }

    #[test]
    fn test_group_preserves_arrival_order() {
        let mut first = raw("nlp-engine", "contradiction");
        first.data = InsightData::new().with("description", "first");
        let mut second = raw("nlp-engine", "contradiction");
        second.data = InsightData::new().with("description", "second");
        let records = vec![first, second];

        let groups = group_insights(&records);
        let descriptions: Vec<_> = groups[0]
            .records
            .iter()
            .filter_map(|r| r.data.description())
            .collect();
        assert_eq!(descriptions, vec!["first", "second"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_insights(&[]).is_empty());
    }
}
