//! Confidence scorer (spec.md §4.2), ported from the source pipeline's
//! `ConfidenceCalculator`: weighted part/description/manufacturer
//! sub-scores, a length penalty, and tiered match-type/status derivation.

use catalog_core_normalizer::{normalize, separator_tokenize, similarity};
use catalog_domain_models::{ConfidenceBreakdown, MatchStatus, MatchType};

const PART_NUMBER_WEIGHT: f64 = 0.6;
const DESCRIPTION_WEIGHT: f64 = 0.4;
const MANUFACTURER_WEIGHT: f64 = 0.2;
const SIMILARITY_THRESHOLD: f64 = 0.1;
const DESCRIPTION_SIMILARITY_THRESHOLD: f64 = 0.3;
const MANUFACTURER_SIMILARITY_THRESHOLD: f64 = 0.5;

pub struct ConfidenceResult {
    pub confidence: f64,
    pub match_type: MatchType,
    pub match_status: MatchStatus,
    pub breakdown: ConfidenceBreakdown,
}

struct SubScore {
    score: f64,
    method: &'static str,
}

pub fn calculate_confidence(
    search_part: &str,
    search_name: &str,
    search_manufacturer: &str,
    db_part: &str,
    db_description: &str,
    db_manufacturer: &str,
) -> ConfidenceResult {
    let part_score = part_number_confidence(search_part, db_part);
    let description_score = description_confidence(search_name, db_description);
    let manufacturer_score = manufacturer_confidence(search_manufacturer, db_manufacturer);

    let weighted = part_score.score * PART_NUMBER_WEIGHT
        + description_score.score * DESCRIPTION_WEIGHT
        + manufacturer_score.score * MANUFACTURER_WEIGHT;

    let length_penalty = length_penalty(search_part, db_part);
    let final_score = (weighted - length_penalty).max(0.0).min(100.0);

    let match_type = determine_match_type(part_score.score, description_score.score, manufacturer_score.score);
    let match_status = determine_match_status(final_score, part_score.score);

    ConfidenceResult {
        confidence: round2(final_score),
        match_type,
        match_status,
        breakdown: ConfidenceBreakdown {
            part_number_score: part_score.score,
            part_number_method: part_score.method.to_string(),
            description_score: description_score.score,
            description_method: description_score.method.to_string(),
            manufacturer_score: manufacturer_score.score,
            manufacturer_method: manufacturer_score.method.to_string(),
            length_penalty,
        },
    }
}

fn part_number_confidence(search_part: &str, db_part: &str) -> SubScore {
    if search_part.is_empty() || db_part.is_empty() {
        return SubScore { score: 0.0, method: "no_data" };
    }

    let search_norm = search_part.trim().to_lowercase();
    let db_norm = db_part.trim().to_lowercase();
    if search_norm == db_norm {
        return SubScore { score: 100.0, method: "exact_match" };
    }

    let search_l2 = normalize(search_part, 2);
    let db_l2 = normalize(db_part, 2);
    if search_l2.to_lowercase() == db_l2.to_lowercase() {
        return SubScore { score: 95.0, method: "normalized_exact" };
    }

    let search_l3 = normalize(search_part, 3);
    let db_l3 = normalize(db_part, 3);
    if search_l3.to_lowercase() == db_l3.to_lowercase() {
        return SubScore { score: 90.0, method: "alnum_exact" };
    }

    let similarities = [
        similarity(&search_part.to_lowercase(), &db_part.to_lowercase()),
        similarity(&search_l2.to_lowercase(), &db_l2.to_lowercase()),
        similarity(&search_l3.to_lowercase(), &db_l3.to_lowercase()),
    ];
    let max_similarity = similarities.into_iter().fold(0.0_f64, f64::max);
    if max_similarity >= SIMILARITY_THRESHOLD {
        return SubScore {
            score: round2(max_similarity * 100.0),
            method: "similarity",
        };
    }

    let lev_distance = catalog_core_normalizer::levenshtein(
        &search_part.to_lowercase(),
        &db_part.to_lowercase(),
        None,
    );
    let max_len = search_part.chars().count().max(db_part.chars().count());
    if max_len > 0 {
        let lev_similarity = 1.0 - (lev_distance as f64 / max_len as f64);
        if lev_similarity >= SIMILARITY_THRESHOLD {
            return SubScore {
                score: round2(lev_similarity * 100.0),
                method: "levenshtein",
            };
        }
    }

    let search_tokens = separator_tokenize(search_part);
    let db_tokens = separator_tokenize(db_part);
    if !search_tokens.is_empty() && !db_tokens.is_empty() {
        let overlap = catalog_core_normalizer::token_overlap(&search_tokens, &db_tokens);
        if overlap >= SIMILARITY_THRESHOLD {
            return SubScore {
                score: round2(overlap * 100.0),
                method: "token_overlap",
            };
        }
    }

    SubScore { score: 0.0, method: "no_match" }
}

fn description_confidence(search_name: &str, db_description: &str) -> SubScore {
    if search_name.is_empty() || db_description.is_empty() {
        return SubScore { score: 0.0, method: "no_data" };
    }

    let search_norm = search_name.trim().to_lowercase();
    let db_norm = db_description.trim().to_lowercase();

    if search_norm == db_norm {
        return SubScore { score: 80.0, method: "exact_description" };
    }
    if db_norm.contains(&search_norm) || search_norm.contains(&db_norm) {
        return SubScore { score: 70.0, method: "contains_match" };
    }

    let search_words: std::collections::HashSet<&str> = search_norm.split_whitespace().collect();
    let db_words: std::collections::HashSet<&str> = db_norm.split_whitespace().collect();
    if !search_words.is_empty() && !db_words.is_empty() {
        let overlap = search_words.intersection(&db_words).count();
        let union = search_words.union(&db_words).count();
        let word_similarity = if union > 0 { overlap as f64 / union as f64 } else { 0.0 };
        if word_similarity >= DESCRIPTION_SIMILARITY_THRESHOLD {
            return SubScore {
                score: round2(word_similarity * 60.0),
                method: "word_overlap",
            };
        }
    }

    let sim = similarity(&search_norm, &db_norm);
    if sim >= DESCRIPTION_SIMILARITY_THRESHOLD {
        return SubScore {
            score: round2(sim * 60.0),
            method: "description_similarity",
        };
    }

    SubScore { score: 0.0, method: "no_description_match" }
}

fn manufacturer_confidence(search_manufacturer: &str, db_manufacturer: &str) -> SubScore {
    if search_manufacturer.is_empty() || db_manufacturer.is_empty() {
        return SubScore { score: 0.0, method: "no_data" };
    }

    let search_norm = search_manufacturer.trim().to_lowercase();
    let db_norm = db_manufacturer.trim().to_lowercase();

    if search_norm == db_norm {
        return SubScore { score: 50.0, method: "exact_manufacturer" };
    }
    if db_norm.contains(&search_norm) || search_norm.contains(&db_norm) {
        return SubScore { score: 40.0, method: "contains_manufacturer" };
    }

    let sim = similarity(&search_norm, &db_norm);
    if sim >= MANUFACTURER_SIMILARITY_THRESHOLD {
        return SubScore {
            score: round2(sim * 50.0),
            method: "manufacturer_similarity",
        };
    }

    SubScore { score: 0.0, method: "no_manufacturer_match" }
}

fn length_penalty(search_part: &str, db_part: &str) -> f64 {
    if search_part.is_empty() || db_part.is_empty() {
        return 0.0;
    }
    let len_diff = (search_part.chars().count() as i64 - db_part.chars().count() as i64).unsigned_abs() as f64;
    let max_len = search_part.chars().count().max(db_part.chars().count()) as f64;
    if max_len == 0.0 {
        return 0.0;
    }
    let ratio = len_diff / max_len;
    if ratio > 0.5 {
        ratio * 20.0
    } else {
        0.0
    }
}

fn determine_match_type(part_score: f64, desc_score: f64, mfg_score: f64) -> MatchType {
    if part_score >= 90.0 {
        MatchType::ExactPartNumber
    } else if part_score >= 70.0 {
        MatchType::FuzzyPartNumber
    } else if desc_score >= 50.0 {
        MatchType::DescriptionMatch
    } else if mfg_score >= 30.0 {
        MatchType::ManufacturerMatch
    } else if part_score >= 30.0 || desc_score >= 30.0 {
        MatchType::PartialMatch
    } else {
        MatchType::NoMatch
    }
}

fn determine_match_status(overall_score: f64, part_score: f64) -> MatchStatus {
    if overall_score >= 70.0 {
        MatchStatus::Found
    } else if overall_score > 0.0 || part_score > 0.0 {
        MatchStatus::Partial
    } else {
        MatchStatus::NotFound
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_case_insensitive_match_scores_one_hundred_on_part_tier() {
        let result = calculate_confidence("abc-123", "", "", "ABC-123", "", "");
        assert_eq!(result.breakdown.part_number_score, 100.0);
        assert_eq!(result.match_type, MatchType::ExactPartNumber);
    }

    #[test]
    fn identical_inputs_yield_identical_score() {
        let a = calculate_confidence("ABC-123", "widget", "acme", "ABC-124", "widget assy", "acme corp");
        let b = calculate_confidence("ABC-123", "widget", "acme", "ABC-124", "widget assy", "acme corp");
        assert_eq!(a.confidence, b.confidence);
    }

    #[test]
    fn final_score_is_clamped_to_0_100() {
        let result = calculate_confidence("ABC-123", "widget", "acme", "ABC-123", "widget", "acme");
        assert!((0.0..=100.0).contains(&result.confidence));
    }

    #[test]
    fn fuzzy_match_status_is_found_or_partial() {
        let result = calculate_confidence("ABC-123", "", "", "ABC124", "", "");
        assert!(result.confidence >= 0.0);
        assert!(matches!(result.match_status, MatchStatus::Found | MatchStatus::Partial | MatchStatus::NotFound));
    }
}
