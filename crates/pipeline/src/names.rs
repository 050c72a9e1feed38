//! Deterministic name classification.
//!
//! Maps a free-text query to zero or more candidate member identities
//! without any LLM involvement. Matching runs in three stages with a
//! short-circuit on exact hits: verbatim substring, edit-distance fuzzy
//! (diacritic-folded, so "Muller" finds "Müller"), and a pattern stage
//! that only flags name-shaped tokens with no corpus counterpart for
//! logging.

use crate::types::{MatchKind, NameMatch};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Minimum length for a single name token to count as a meaningful
/// fragment. Two-letter particles ("de", "al") match far too freely.
const MIN_TOKEN_FRAGMENT_LEN: usize = 3;

/// One corpus member in the index.
#[derive(Debug, Clone)]
struct NameEntry {
    user_id: String,
    user_name: String,
    full_lower: String,
    full_folded: String,
    token_count: usize,
    tokens_lower: Vec<String>,
}

/// Classifier index over the deduplicated member names of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: Vec<NameEntry>,
}

impl NameIndex {
    /// Build an index from (user_id, user_name) pairs.
    ///
    /// Callers are expected to pass each member once; duplicate user_ids
    /// keep the first name seen.
    pub fn build<I>(members: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut entries: Vec<NameEntry> = Vec::new();

        for (user_id, user_name) in members {
            if entries.iter().any(|e| e.user_id == user_id) {
                continue;
            }

            let full_lower = user_name.to_lowercase();
            let full_folded = fold_diacritics(&full_lower);
            let tokens_lower: Vec<String> = full_lower
                .unicode_words()
                .map(|w| w.to_string())
                .collect();

            entries.push(NameEntry {
                user_id,
                user_name,
                token_count: tokens_lower.len().max(1),
                full_lower,
                full_folded,
                tokens_lower,
            });
        }

        Self { entries }
    }

    /// Number of indexed members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classify a query into candidate member identities, best first.
    ///
    /// Returns an empty vector when the query names nobody the corpus
    /// knows; that is a valid outcome, not an error.
    pub fn classify(&self, query: &str, fuzzy_floor: f32) -> Vec<NameMatch> {
        let query_lower = query.to_lowercase();
        let query_words: Vec<String> = query_lower.unicode_words().map(|w| w.to_string()).collect();

        // Stage 1: exact case-insensitive hits short-circuit everything else.
        let exact = self.classify_exact(&query_lower, &query_words);
        if !exact.is_empty() {
            return sorted(exact);
        }

        // Stage 2: fuzzy matching over diacritic-folded names.
        let fuzzy = self.classify_fuzzy(&query_words, fuzzy_floor);
        if !fuzzy.is_empty() {
            return sorted(fuzzy);
        }

        // Stage 3: flag name-shaped tokens we cannot resolve. Logged for
        // downstream diagnostics; produces no matches.
        self.log_unresolved_names(query);

        Vec::new()
    }

    fn classify_exact(&self, query_lower: &str, query_words: &[String]) -> Vec<NameMatch> {
        // Full-name hits win outright. A query that spells out "Hans
        // Müller" must not also drag in every other Hans through the
        // fragment rule below.
        let full: Vec<NameMatch> = self
            .entries
            .iter()
            .filter(|entry| query_lower.contains(&entry.full_lower))
            .map(|entry| NameMatch {
                user_id: entry.user_id.clone(),
                user_name: entry.user_name.clone(),
                match_kind: MatchKind::Exact,
                confidence: 1.0,
                matched_span: entry.full_lower.chars().count(),
            })
            .collect();

        if !full.is_empty() {
            return full;
        }

        // A lone first or last name is still an exact identity hit.
        let mut matches = Vec::new();

        for entry in &self.entries {
            if let Some(token) = entry
                .tokens_lower
                .iter()
                .filter(|t| t.chars().count() >= MIN_TOKEN_FRAGMENT_LEN)
                .find(|t| query_words.iter().any(|w| w == *t))
            {
                matches.push(NameMatch {
                    user_id: entry.user_id.clone(),
                    user_name: entry.user_name.clone(),
                    match_kind: MatchKind::Exact,
                    confidence: 1.0,
                    matched_span: token.chars().count(),
                });
            }
        }

        matches
    }

    fn classify_fuzzy(&self, query_words: &[String], fuzzy_floor: f32) -> Vec<NameMatch> {
        let folded_words: Vec<String> =
            query_words.iter().map(|w| fold_diacritics(w)).collect();

        let mut matches = Vec::new();

        for entry in &self.entries {
            let mut best: Option<(f32, usize)> = None;

            // Slide a window of the name's own token count across the query
            // and compare against the folded full name.
            if folded_words.len() >= entry.token_count {
                for window in folded_words.windows(entry.token_count) {
                    let joined = window.join(" ");
                    let sim = normalized_similarity(&joined, &entry.full_folded);
                    best = pick_best(best, sim, joined.chars().count());
                }
            }

            // Single tokens also carry identity ("Petrva" -> "Petrova").
            for (word, folded) in query_words.iter().zip(folded_words.iter()) {
                if word.chars().count() < MIN_TOKEN_FRAGMENT_LEN {
                    continue;
                }
                for token in &entry.tokens_lower {
                    if token.chars().count() < MIN_TOKEN_FRAGMENT_LEN {
                        continue;
                    }
                    let sim = normalized_similarity(folded, &fold_diacritics(token));
                    best = pick_best(best, sim, word.chars().count());
                }
            }

            if let Some((confidence, matched_span)) = best {
                if confidence >= fuzzy_floor {
                    matches.push(NameMatch {
                        user_id: entry.user_id.clone(),
                        user_name: entry.user_name.clone(),
                        match_kind: MatchKind::Fuzzy,
                        confidence,
                        matched_span,
                    });
                }
            }
        }

        matches
    }

    fn log_unresolved_names(&self, query: &str) {
        // Capitalized word sequences are name-shaped; anything reaching this
        // stage has no corpus counterpart.
        let name_shape = Regex::new(r"\p{Lu}[\p{Ll}\p{M}'’-]+(?:\s+\p{Lu}[\p{Ll}\p{M}'’-]+)+")
            .expect("name shape pattern");

        for capture in name_shape.find_iter(query) {
            tracing::info!(
                candidate = %capture.as_str(),
                "possible name in query with no corpus match"
            );
        }
    }
}

fn pick_best(best: Option<(f32, usize)>, sim: f32, span: usize) -> Option<(f32, usize)> {
    match best {
        None => Some((sim, span)),
        Some((best_sim, best_span)) => {
            if sim > best_sim || (sim == best_sim && span < best_span) {
                Some((sim, span))
            } else {
                Some((best_sim, best_span))
            }
        }
    }
}

/// Order matches: higher confidence first, then shorter matched span
/// (most specific), then user_id for a total order.
fn sorted(mut matches: Vec<NameMatch>) -> Vec<NameMatch> {
    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.matched_span.cmp(&b.matched_span))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    matches
}

/// Normalized Levenshtein similarity in 0.0-1.0.
fn normalized_similarity(a: &str, b: &str) -> f32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let max_len = a_chars.len().max(b_chars.len());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein(&a_chars, &b_chars);
    1.0 - (distance as f32 / max_len as f32)
}

/// Classic two-row Levenshtein distance over characters.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Fold common Latin diacritics to their ASCII base so transliteration
/// variants compare equal. Input is expected lowercased.
fn fold_diacritics(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => folded.push('a'),
            'ç' | 'ć' | 'č' => folded.push('c'),
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' => folded.push('e'),
            'ì' | 'í' | 'î' | 'ï' | 'ī' => folded.push('i'),
            'ñ' | 'ń' | 'ň' => folded.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => folded.push('o'),
            'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => folded.push('u'),
            'ý' | 'ÿ' => folded.push('y'),
            'ś' | 'š' => folded.push('s'),
            'ź' | 'ż' | 'ž' => folded.push('z'),
            'ł' => folded.push('l'),
            'đ' => folded.push('d'),
            'ř' => folded.push('r'),
            'ť' => folded.push('t'),
            'ğ' => folded.push('g'),
            'ß' => folded.push_str("ss"),
            'æ' => folded.push_str("ae"),
            'œ' => folded.push_str("oe"),
            ch => folded.push(ch),
        }
    }

    folded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> NameIndex {
        NameIndex::build(vec![
            ("u-1".to_string(), "Hans Müller".to_string()),
            ("u-2".to_string(), "Elena Petrova".to_string()),
            ("u-3".to_string(), "Hans Gruber".to_string()),
        ])
    }

    #[test]
    fn test_exact_full_name_match() {
        let matches = index().classify("What does Hans Müller need for November 10?", 0.8);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user_id, "u-1");
        assert_eq!(matches[0].match_kind, MatchKind::Exact);
        assert_eq!(matches[0].confidence, 1.0);
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let matches = index().classify("what does elena petrova want?", 0.8);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user_id, "u-2");
        assert_eq!(matches[0].match_kind, MatchKind::Exact);
    }

    #[test]
    fn test_last_name_fragment_is_exact() {
        let matches = index().classify("Any updates from Petrova this week?", 0.8);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user_id, "u-2");
        assert_eq!(matches[0].match_kind, MatchKind::Exact);
        assert_eq!(matches[0].confidence, 1.0);
    }

    #[test]
    fn test_shared_first_name_matches_both() {
        let matches = index().classify("What did Hans ask for?", 0.8);

        assert_eq!(matches.len(), 2);
        let ids: Vec<&str> = matches.iter().map(|m| m.user_id.as_str()).collect();
        assert!(ids.contains(&"u-1"));
        assert!(ids.contains(&"u-3"));
        assert!(matches.iter().all(|m| m.match_kind == MatchKind::Exact));
    }

    #[test]
    fn test_transliteration_variant_is_fuzzy() {
        // "Muller" is not a verbatim hit for "Müller" but folds to it.
        let matches = index().classify("What does Muller need?", 0.8);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user_id, "u-1");
        assert_eq!(matches[0].match_kind, MatchKind::Fuzzy);
        assert!(matches[0].confidence >= 0.8);
    }

    #[test]
    fn test_typo_within_edit_distance_two() {
        let matches = index().classify("What does Hnas Muller need?", 0.8);

        assert!(!matches.is_empty());
        assert_eq!(matches[0].user_id, "u-1");
        assert_eq!(matches[0].match_kind, MatchKind::Fuzzy);
        assert!(matches[0].confidence >= 0.8);
    }

    #[test]
    fn test_unknown_name_yields_no_matches() {
        let matches = index().classify("What does Marco Bianchi need?", 0.8);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_no_name_in_query_yields_no_matches() {
        let matches = index().classify("any open requests this week?", 0.8);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_exact_short_circuits_fuzzy() {
        // "Hans Müller" is exact for u-1; u-3 shares the first name and is
        // exact too, but no fuzzy entries appear alongside exact ones.
        let matches = index().classify("Hans Müller and Hans", 0.8);
        assert!(matches.iter().all(|m| m.match_kind == MatchKind::Exact));
    }

    #[test]
    fn test_tie_break_orders_by_matched_span() {
        let index = NameIndex::build(vec![
            ("u-1".to_string(), "Ana Lima".to_string()),
            ("u-2".to_string(), "Ana Lima Costa".to_string()),
        ]);

        // Both full names are verbatim substrings of this query.
        let matches = index.classify("Did Ana Lima Costa confirm the booking?", 0.8);

        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.confidence == 1.0));
        // Same confidence: ordered by matched span, ascending.
        assert_eq!(matches[0].user_id, "u-1");
        assert!(matches[0].matched_span < matches[1].matched_span);
    }

    #[test]
    fn test_full_name_hit_suppresses_fragment_hits() {
        let matches = index().classify("What does Hans Müller need?", 0.8);

        // "Hans Gruber" shares the first name but must not appear when the
        // query spells out a full corpus name.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user_id, "u-1");
    }

    #[test]
    fn test_duplicate_user_ids_deduplicated() {
        let index = NameIndex::build(vec![
            ("u-1".to_string(), "Hans Müller".to_string()),
            ("u-1".to_string(), "Hans Mueller".to_string()),
        ]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_levenshtein_basics() {
        let a: Vec<char> = "kitten".chars().collect();
        let b: Vec<char> = "sitting".chars().collect();
        assert_eq!(levenshtein(&a, &b), 3);

        let empty: Vec<char> = Vec::new();
        assert_eq!(levenshtein(&empty, &b), 7);
    }

    #[test]
    fn test_fold_diacritics() {
        assert_eq!(fold_diacritics("müller"), "muller");
        assert_eq!(fold_diacritics("straße"), "strasse");
        assert_eq!(fold_diacritics("françois"), "francois");
        assert_eq!(fold_diacritics("plain"), "plain");
    }
}
