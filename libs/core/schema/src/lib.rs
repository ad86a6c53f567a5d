//! Canonical dataset schema, header validation and part-number derivation
//! (component C).
//!
//! Grounded on the source pipeline's schema definition module: eight fixed
//! canonical headers, order-independent validation tolerating extra
//! columns, and derivation of `part_number` from free-text description
//! tokens when the source has no explicit part-number column.

use catalog_domain_models::DatasetRow;
use serde_json::Value;
use std::collections::HashMap;

/// The eight canonical headers, in their documented order.
pub const CANONICAL_HEADERS: &[&str] = &[
    "Potential Buyer 1",
    "Item_Description",
    "Quantity",
    "UQC",
    "Unit_Price",
    "Potential Buyer 2",
    "Potential Buyer 1 Contact Details",
    "Potential Buyer 1 email id",
];

/// Validates that every canonical header is present among `incoming`
/// (order-independent; extra columns are tolerated). Returns the missing
/// headers, if any.
pub fn validate_headers(incoming: &[String]) -> Result<(), Vec<String>> {
    let present: std::collections::HashSet<&str> = incoming.iter().map(String::as_str).collect();
    let missing: Vec<String> = CANONICAL_HEADERS
        .iter()
        .filter(|h| !present.contains(*h))
        .map(|h| h.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

/// Picks the longest whitespace-separated token carrying a digit (part
/// numbers are overwhelmingly distinguished by their digits, whether or
/// not they also carry letters) with length >= 3; if none qualifies, the
/// first token of length >= 3; otherwise `None`. Deterministic; ties on
/// length are broken by first occurrence.
///
/// Note: the distilled spec's prose says "mixes letters and digits", but
/// its own worked example derives `"3585720"` (pure digits, no letters)
/// from `"CONN 3585720 GOLD"`. A strict letters-and-digits mix would
/// instead fall back to the first token (`"CONN"`) there, so this
/// implementation follows the worked example: any digit-bearing token
/// qualifies, not only mixed ones. See DESIGN.md.
pub fn derive_part_number(description: &str) -> Option<String> {
    let tokens: Vec<&str> = description.split_whitespace().collect();

    let digit_candidates: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| t.len() >= 3 && t.chars().any(|c| c.is_ascii_digit()))
        .collect();

    if let Some(longest) = digit_candidates.iter().max_by_key(|t| t.len()).copied() {
        return Some(longest.to_string());
    }

    tokens
        .into_iter()
        .find(|t| t.len() >= 3)
        .map(|t| t.to_string())
}

/// Strips thousands separators (commas) before parsing, matching the
/// source pipeline's coercion rule for `Quantity`/`Unit_Price`.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<f64>().ok()
}

/// Projects a raw header->value row map onto the canonical `DatasetRow`,
/// null-filling missing fields, coercing `Quantity`/`Unit_Price`, and
/// attaching the derived `part_number`.
pub fn normalize_row(raw: &HashMap<String, Value>) -> DatasetRow {
    let primary_buyer = string_field(raw, "Potential Buyer 1");
    let item_description = string_field(raw, "Item_Description");
    let quantity = raw
        .get("Quantity")
        .and_then(value_to_numeric_string)
        .and_then(|s| coerce_numeric(&s))
        .map(|v| v as i64)
        .unwrap_or(0);
    let unit_of_measure = string_field(raw, "UQC");
    let unit_price = raw
        .get("Unit_Price")
        .and_then(value_to_numeric_string)
        .and_then(|s| coerce_numeric(&s))
        .unwrap_or(0.0);
    let secondary_buyer = optional_string_field(raw, "Potential Buyer 2");
    let primary_buyer_contact = optional_string_field(raw, "Potential Buyer 1 Contact Details");
    let primary_buyer_email = optional_string_field(raw, "Potential Buyer 1 email id");
    let part_number = derive_part_number(&item_description);

    DatasetRow {
        primary_buyer,
        item_description,
        quantity,
        unit_of_measure,
        unit_price,
        secondary_buyer,
        primary_buyer_contact,
        primary_buyer_email,
        part_number,
    }
}

fn string_field(raw: &HashMap<String, Value>, key: &str) -> String {
    raw.get(key)
        .map(value_to_display_string)
        .unwrap_or_default()
}

fn optional_string_field(raw: &HashMap<String, Value>, key: &str) -> Option<String> {
    raw.get(key).map(value_to_display_string).filter(|s| !s.is_empty())
}

fn value_to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_to_numeric_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validates a single row's invariants (spec.md §3): non-negative
/// quantity/price, string fields within the length bound.
pub fn validate_row(row: &DatasetRow) -> bool {
    const MAX_STRING_LEN: usize = 4000;
    if row.quantity < 0 || row.unit_price < 0.0 {
        return false;
    }
    let fields = [
        &row.primary_buyer,
        &row.item_description,
        &row.unit_of_measure,
    ];
    for field in fields {
        if field.len() > MAX_STRING_LEN {
            return false;
        }
    }
    for optional in [
        &row.secondary_buyer,
        &row.primary_buyer_contact,
        &row.primary_buyer_email,
    ] {
        if let Some(value) = optional {
            if value.len() > MAX_STRING_LEN {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_headers_is_order_independent_and_tolerates_extras() {
        let mut headers: Vec<String> = CANONICAL_HEADERS.iter().map(|s| s.to_string()).collect();
        headers.reverse();
        headers.push("Extra Column".to_string());
        assert!(validate_headers(&headers).is_ok());
    }

    #[test]
    fn validate_headers_reports_missing() {
        let headers = vec!["Potential Buyer 1".to_string()];
        let err = validate_headers(&headers).unwrap_err();
        assert!(err.contains(&"Item_Description".to_string()));
    }

    #[test]
    fn derive_part_number_picks_longest_mixed_token() {
        assert_eq!(
            derive_part_number("CONN 3585720 GOLD").as_deref(),
            Some("3585720")
        );
        assert_eq!(derive_part_number("BOLT-M8x20").as_deref(), Some("BOLT-M8x20"));
        assert_eq!(derive_part_number("WIDGET assy 12-AB").as_deref(), Some("12-AB"));
    }

    #[test]
    fn derive_part_number_falls_back_to_first_long_token() {
        assert_eq!(derive_part_number("alpha beta gamma").as_deref(), Some("alpha"));
    }

    #[test]
    fn derive_part_number_none_when_no_token_qualifies() {
        assert_eq!(derive_part_number("a b"), None);
    }

    #[test]
    fn coerce_numeric_strips_thousands_separators() {
        assert_eq!(coerce_numeric("1,234.50"), Some(1234.50));
    }
}
