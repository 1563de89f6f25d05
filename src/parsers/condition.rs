use once_cell::sync::Lazy;
use regex::Regex;

use super::normalize_amount;
use crate::models::ListingCondition;

// The zero must stand alone so "10 km" and "1.000 km" do not count.
static ZERO_KM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\d.,])0\s*km\b")
        .expect("Invalid zero km regex")
});

static MILEAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:\.\d{3})+|\d+)\s*km\b")
        .expect("Invalid mileage regex")
});

/// True for "0 KM", "0km", "0 Km" and similar.
pub fn has_zero_km_marker(text: &str) -> bool {
    ZERO_KM_REGEX.is_match(text)
}

/// First `<number> km` amount in the text, thousands separators removed.
pub fn parse_mileage(text: &str) -> Option<u64> {
    MILEAGE_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_amount(m.as_str()))
}

/// Condition and mileage from a listing description.
///
/// A zero-mileage marker means a new vehicle and suppresses the mileage search.
pub fn parse_condition_and_mileage(description: &str) -> (ListingCondition, u64) {
    if has_zero_km_marker(description) {
        return (ListingCondition::New, 0);
    }
    let mileage = parse_mileage(description).unwrap_or(0);
    (ListingCondition::Used, mileage)
}

pub fn condition_from_mileage(mileage: Option<u64>) -> ListingCondition {
    match mileage {
        Some(0) => ListingCondition::New,
        _ => ListingCondition::Used,
    }
}
