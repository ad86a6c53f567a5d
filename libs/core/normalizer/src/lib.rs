//! Deterministic part-number canonicalization, tokenization and similarity
//! scoring (component A).
//!
//! Ported from the separator/level scheme in the source pipeline's
//! `part_number` helper: three normalization levels, alpha/digit boundary
//! tokenization, a bounded Levenshtein distance, and the similarity/overlap
//! measures built on top of it.

use std::collections::HashSet;

/// Separator characters recognized by `normalize` levels 2/3 and by
/// `separator_tokenize`.
pub const SEPARATORS: &[char] = &['-', '/', ',', '*', '&', '~', '.', '%'];

/// Default minimum similarity threshold used by callers that need a single
/// knob (the confidence scorer configures its own thresholds per tier).
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.6;

#[derive(Debug, Clone, Copy)]
pub struct NormalizerConfig {
    pub min_similarity: f64,
    pub enable_format_variants: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            enable_format_variants: true,
        }
    }
}

/// Collapses internal whitespace and trims. Level 2 additionally strips
/// separators; level 3 keeps only ASCII alphanumerics. Idempotent within a
/// level.
pub fn normalize(s: &str, level: u8) -> String {
    let trimmed = collapse_whitespace(s.trim());
    match level {
        1 => trimmed,
        2 => trimmed
            .chars()
            .filter(|c| !SEPARATORS.contains(c))
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(""),
        3 => trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect(),
        _ => trimmed,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits on separators and whitespace, then further splits each fragment
/// at alphabetic<->digit boundaries. Returns a finite ordered sequence of
/// non-empty alphanumeric chunks.
pub fn separator_tokenize(s: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    for ch in s.chars() {
        if SEPARATORS.contains(&ch) || ch.is_whitespace() {
            if !current.is_empty() {
                fragments.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }

    let mut tokens = Vec::new();
    for fragment in fragments {
        tokens.extend(split_alpha_digit_boundaries(&fragment));
    }
    tokens
}

fn split_alpha_digit_boundaries(fragment: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_is_digit: Option<bool> = None;

    for ch in fragment.chars() {
        let is_digit = ch.is_ascii_digit();
        match current_is_digit {
            Some(prev) if prev != is_digit => {
                out.push(std::mem::take(&mut current));
                current.push(ch);
                current_is_digit = Some(is_digit);
            }
            _ => {
                current.push(ch);
                current_is_digit = Some(is_digit);
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Unit-cost Levenshtein edit distance. `bound`, when given, allows an
/// early exit once every entry of the current row exceeds it: the true
/// distance is known to exceed `bound` and the returned value is only a
/// lower bound in that case (callers using `bound` only care about the
/// yes/no "within bound" answer).
pub fn levenshtein(a: &str, b: &str, bound: Option<usize>) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());

    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut previous: Vec<usize> = (0..=m).collect();
    let mut current = vec![0usize; m + 1];

    for i in 1..=n {
        current[0] = i;
        let mut row_min = current[0];
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
            row_min = row_min.min(current[j]);
        }
        if let Some(limit) = bound {
            if row_min > limit {
                return row_min;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[m]
}

/// `1 - levenshtein(a,b)/max(|a|,|b|)`, in `[0,1]`. Empty/empty is defined
/// as 1 (identical), empty/non-empty as 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b, None);
    1.0 - (distance as f64 / max_len as f64)
}

/// Jaccard index over case-folded token sets.
pub fn token_overlap(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<String> = a.iter().map(|t| t.to_lowercase()).collect();
    let set_b: HashSet<String> = b.iter().map(|t| t.to_lowercase()).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Yields `(normalize(s,1),1)`, `(normalize(s,2),2)`, `(normalize(s,3),3)`
/// deduplicated by `(lower, level)`, preserving order.
pub fn format_variants(s: &str) -> Vec<(String, u8)> {
    let mut seen = HashSet::new();
    let mut variants = Vec::new();
    for level in 1..=3u8 {
        let normalized = normalize(s, level);
        let key = (normalized.to_lowercase(), level);
        if seen.insert(key) {
            variants.push((normalized, level));
        }
    }
    variants
}

/// Trigram (character 3-gram) Jaccard similarity, used by the relational
/// fuzzy backend where the storage engine has no native trigram function
/// (see DESIGN.md for the rationale).
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let grams_a = char_trigrams(a);
    let grams_b = char_trigrams(b);
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }
    let intersection = grams_a.intersection(&grams_b).count();
    let union = grams_a.union(&grams_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn char_trigrams(s: &str) -> HashSet<String> {
    let chars: Vec<char> = s.to_lowercase().chars().collect();
    if chars.len() < 3 {
        let mut set = HashSet::new();
        if !chars.is_empty() {
            set.insert(chars.iter().collect());
        }
        return set;
    }
    chars
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent_per_level() {
        for level in 1..=3u8 {
            let raw = "  ABC-123/def  ";
            let once = normalize(raw, level);
            let twice = normalize(&once, level);
            assert_eq!(once, twice, "level {level} not idempotent");
        }
    }

    #[test]
    fn normalize_level_two_strips_separators() {
        let out = normalize("ABC-123/DEF", 2);
        assert!(!out.chars().any(|c| SEPARATORS.contains(&c)));
    }

    #[test]
    fn normalize_level_three_keeps_only_alphanumerics() {
        let out = normalize("ABC-123/DEF %", 3);
        assert!(out.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn similarity_is_reflexive_and_bounded() {
        assert_eq!(similarity("ABC-123", "ABC-123"), 1.0);
        let s = similarity("ABC-123", "XYZ-999");
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn similarity_is_symmetric() {
        assert_eq!(similarity("ABC123", "ABD124"), similarity("ABD124", "ABC123"));
    }

    #[test]
    fn separator_tokenize_splits_on_alpha_digit_boundary() {
        let tokens = separator_tokenize("CONN3585720GOLD");
        assert_eq!(tokens, vec!["CONN", "3585720", "GOLD"]);
    }

    #[test]
    fn separator_tokenize_splits_on_separators_and_whitespace() {
        let tokens = separator_tokenize("BOLT-M8x20 washer");
        assert_eq!(
            tokens,
            vec!["BOLT", "M", "8", "x", "20", "washer"]
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn token_overlap_matches_jaccard() {
        let a = vec!["abc".to_string(), "123".to_string()];
        let b = vec!["abc".to_string(), "999".to_string()];
        assert!((token_overlap(&a, &b) - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn levenshtein_bound_short_circuits() {
        let full = levenshtein("abcdef", "uvwxyz", None);
        let bounded = levenshtein("abcdef", "uvwxyz", Some(1));
        assert!(bounded >= 1);
        assert!(full >= bounded);
    }

    #[test]
    fn format_variants_are_deduplicated_preserving_order() {
        let variants = format_variants("ABC");
        let mut seen = HashSet::new();
        for (value, level) in &variants {
            assert!(seen.insert((value.to_lowercase(), *level)));
        }
    }
}
