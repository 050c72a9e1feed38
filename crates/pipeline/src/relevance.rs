//! Relevance filtering.
//!
//! Separates actionable request content from acknowledgements, thanks, and
//! fragments before retrieval, so the synthesizer can never ground an
//! answer in noise. Purely threshold-based; no LLM involved.

use crate::types::NormalizedRecord;

/// Filter out low-information records and those under the quality cutoff,
/// returning survivors ranked by quality score descending.
///
/// An empty result is a valid outcome meaning "nothing actionable".
pub fn filter_relevant(records: Vec<NormalizedRecord>, cutoff: f32) -> Vec<NormalizedRecord> {
    let total = records.len();

    let mut kept: Vec<NormalizedRecord> = records
        .into_iter()
        .filter(|r| !r.is_low_information && r.quality_score >= cutoff)
        .collect();

    kept.sort_by(|a, b| {
        b.quality_score
            .partial_cmp(&a.quality_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.record.timestamp.cmp(&a.record.timestamp))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });

    tracing::debug!(
        "Relevance filter kept {}/{} records (cutoff {:.2})",
        kept.len(),
        total,
        cutoff
    );

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRecord;
    use chrono::{TimeZone, Utc};

    fn normalized(id: &str, quality: f32, low_info: bool, day: u32) -> NormalizedRecord {
        NormalizedRecord {
            record: MessageRecord {
                id: id.to_string(),
                user_id: "u-1".to_string(),
                user_name: "Hans Müller".to_string(),
                timestamp: Utc.with_ymd_and_hms(2025, 11, day, 12, 0, 0).unwrap(),
                message: String::new(),
            },
            clean_text: String::new(),
            is_low_information: low_info,
            quality_score: quality,
        }
    }

    #[test]
    fn test_low_information_records_excluded() {
        let records = vec![
            normalized("m-1", 0.0, true, 1),
            normalized("m-2", 0.9, false, 2),
        ];

        let kept = filter_relevant(records, 0.3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.id, "m-2");
    }

    #[test]
    fn test_quality_cutoff_applied() {
        let records = vec![
            normalized("m-1", 0.25, false, 1),
            normalized("m-2", 0.30, false, 2),
            normalized("m-3", 0.75, false, 3),
        ];

        let kept = filter_relevant(records, 0.3);
        assert_eq!(kept.len(), 2);
        // Cutoff is inclusive
        assert!(kept.iter().any(|r| r.record.id == "m-2"));
    }

    #[test]
    fn test_ranked_by_quality_descending() {
        let records = vec![
            normalized("m-1", 0.4, false, 1),
            normalized("m-2", 0.9, false, 2),
            normalized("m-3", 0.6, false, 3),
        ];

        let kept = filter_relevant(records, 0.3);
        let ids: Vec<&str> = kept.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, vec!["m-2", "m-3", "m-1"]);
    }

    #[test]
    fn test_equal_quality_prefers_more_recent() {
        let records = vec![
            normalized("m-1", 0.5, false, 1),
            normalized("m-2", 0.5, false, 9),
        ];

        let kept = filter_relevant(records, 0.3);
        assert_eq!(kept[0].record.id, "m-2");
    }

    #[test]
    fn test_empty_input_is_valid() {
        let kept = filter_relevant(Vec::new(), 0.3);
        assert!(kept.is_empty());
    }
}
