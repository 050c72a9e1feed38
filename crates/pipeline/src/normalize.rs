//! Record normalization.
//!
//! Cleans and canonicalizes raw message records before any filtering:
//! whitespace collapse, Unicode punctuation repair, low-information
//! flagging, and a quality heuristic over request verbs and concrete
//! entities. Normalization is pure and must never fail the pipeline:
//! anything unparseable comes out flagged low-information with quality 0.

use crate::types::{MessageRecord, NormalizedRecord};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Weight of a recognizable request verb in the quality score.
const VERB_WEIGHT: f32 = 0.4;

/// Weight of a concrete entity (date, number, proper noun).
const ENTITY_WEIGHT: f32 = 0.3;

/// Weight of the token-count component.
const LENGTH_WEIGHT: f32 = 0.3;

/// Token count at which the length component saturates.
const LENGTH_SATURATION: f32 = 12.0;

/// Record normalizer with precompiled pattern sets.
pub struct Normalizer {
    /// Token threshold below which a record is low-information
    min_tokens: usize,

    gratitude_re: Regex,
    request_verb_re: Regex,
    date_re: Regex,
    number_re: Regex,
}

impl Normalizer {
    /// Create a normalizer with the given low-information token threshold.
    pub fn new(min_tokens: usize) -> Self {
        // Pattern construction is infallible for these literals.
        let gratitude_re = Regex::new(
            r"(?i)\b(thank(s| you| u)?|thx|ty|appreciate (it|that|this)|much appreciated|cheers)\b",
        )
        .expect("gratitude pattern");

        let request_verb_re = Regex::new(
            r"(?i)\b(book|need|reserve|want|schedule|arrange|request|look(ing)?|find|help|plan)\w*\b",
        )
        .expect("request verb pattern");

        let date_re = Regex::new(
            r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\b|\b\d{1,2}(st|nd|rd|th)\b|\b\d{4}\b",
        )
        .expect("date pattern");

        let number_re = Regex::new(
            r"(?i)\b(\d+|one|two|three|four|five|six|seven|eight|nine|ten)\b",
        )
        .expect("number pattern");

        Self {
            min_tokens,
            gratitude_re,
            request_verb_re,
            date_re,
            number_re,
        }
    }

    /// Normalize one raw record.
    ///
    /// Pure function: no I/O, no shared state, deterministic output.
    pub fn normalize(&self, record: &MessageRecord) -> NormalizedRecord {
        let clean_text = clean_text(&record.message);

        let token_count = clean_text.unicode_words().count();
        let has_request_verb = self.request_verb_re.is_match(&clean_text);

        // A pure acknowledgement with no accompanying request carries no
        // answerable content, however polite.
        let is_gratitude_only = self.gratitude_re.is_match(&clean_text) && !has_request_verb;

        let is_low_information = token_count < self.min_tokens || is_gratitude_only;

        let quality_score = if is_low_information {
            0.0
        } else {
            let has_entity = self.date_re.is_match(&clean_text)
                || self.number_re.is_match(&clean_text)
                || has_proper_noun(&clean_text);

            let verb_component = if has_request_verb { VERB_WEIGHT } else { 0.0 };
            let entity_component = if has_entity { ENTITY_WEIGHT } else { 0.0 };
            let length_component =
                LENGTH_WEIGHT * (token_count as f32 / LENGTH_SATURATION).min(1.0);

            verb_component + entity_component + length_component
        };

        NormalizedRecord {
            record: record.clone(),
            clean_text,
            is_low_information,
            quality_score,
        }
    }
}

/// Collapse whitespace and map common Unicode punctuation variants to
/// their ASCII equivalents without altering semantic content.
fn clean_text(raw: &str) -> String {
    let mut mapped = String::with_capacity(raw.len());

    for ch in raw.chars() {
        match ch {
            '\u{2014}' | '\u{2013}' | '\u{2012}' | '\u{2015}' => mapped.push_str(" - "),
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => mapped.push('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => mapped.push('"'),
            '\u{2026}' => mapped.push_str("..."),
            '\u{00a0}' | '\u{2009}' | '\u{200a}' | '\u{202f}' | '\u{3000}' => mapped.push(' '),
            '\u{200b}' | '\u{feff}' => {}
            ch if ch.is_control() => mapped.push(' '),
            ch => mapped.push(ch),
        }
    }

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capitalized token in a non-leading position, a cheap proper-noun signal
/// for places and other named entities.
fn has_proper_noun(text: &str) -> bool {
    text.unicode_words()
        .skip(1)
        .any(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record_with(message: &str) -> MessageRecord {
        MessageRecord {
            id: "m-1".to_string(),
            user_id: "u-1".to_string(),
            user_name: "Hans Müller".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 11, 1, 9, 30, 0).unwrap(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_whitespace_collapse() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with("  need   a\t\ttable \n for  four "));
        assert_eq!(normalized.clean_text, "need a table for four");
    }

    #[test]
    fn test_unicode_punctuation_repair() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with(
            "I\u{2019}m flying to San Francisco\u{2014}book the first class for two on November 10.",
        ));
        assert!(normalized.clean_text.contains("I'm flying"));
        assert!(normalized.clean_text.contains("San Francisco - book"));
        assert!(!normalized.clean_text.contains('\u{2014}'));
    }

    #[test]
    fn test_pure_acknowledgement_is_low_information() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with("Thank you so much!"));
        assert!(normalized.is_low_information);
        assert_eq!(normalized.quality_score, 0.0);
    }

    #[test]
    fn test_thanks_with_request_is_kept() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with(
            "Thanks! Also need a rental car for three days in Lisbon.",
        ));
        assert!(!normalized.is_low_information);
        assert!(normalized.quality_score > 0.0);
    }

    #[test]
    fn test_fragment_under_token_threshold() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with("I finally"));
        assert!(normalized.is_low_information);
        assert_eq!(normalized.quality_score, 0.0);
    }

    #[test]
    fn test_empty_message_never_errors() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with(""));
        assert!(normalized.is_low_information);
        assert_eq!(normalized.quality_score, 0.0);
        assert_eq!(normalized.clean_text, "");
    }

    #[test]
    fn test_actionable_request_scores_high() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with(
            "I'm flying to San Francisco - book the first class for two on November 10.",
        ));
        assert!(!normalized.is_low_information);
        // Request verb + date + number + length: full marks
        assert!(normalized.quality_score > 0.9);
    }

    #[test]
    fn test_vague_chatter_scores_low() {
        let normalizer = Normalizer::new(3);
        let normalized = normalizer.normalize(&record_with("well that was quite something"));
        assert!(!normalized.is_low_information);
        assert!(normalized.quality_score < 0.3);
    }

    #[test]
    fn test_quality_score_bounded() {
        let normalizer = Normalizer::new(3);
        let long_message = "book reserve need want schedule a villa for eight people in \
                            Florence from June 1st to June 10th 2026 with a private chef";
        let normalized = normalizer.normalize(&record_with(long_message));
        assert!(normalized.quality_score <= 1.0);
    }
}
