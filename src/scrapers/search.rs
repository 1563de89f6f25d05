use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::ListingExtractor;
use crate::error::ExtractError;
use crate::models::{
    canonical_attributes, Currency, ListingId, ListingRecord, PLACEHOLDER_TITLE_PREFIX,
};
use crate::parsers::details::YEAR_PATTERN;
use crate::parsers::{
    cleaned_group, condition_from_mileage, first_match, normalize_amount, parse_location,
    raw_group, FieldRule,
};

/// Opening tag of a result card; the class list must contain the bare `poly-card` token.
static CARD_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*\bclass="(?:[^"]*\s)?poly-card(?:\s[^"]*)?"[^>]*>"#)
        .expect("Invalid card start regex")
});

static RESULTS_LIST_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</ol>")
        .expect("Invalid results list end regex")
});

static LIST_ITEM_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(/)?li\b[^>]*>")
        .expect("Invalid list item tag regex")
});

static CARD_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)class="poly-component__title"[^>]*>([^<]+)<"#)
        .expect("Invalid card title regex")
});

static USD_ARIA_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)aria-label="(\d+(?:\.\d+)*)\s*dólares""#)
        .expect("Invalid USD amount regex")
});

static ARS_ARIA_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)aria-label="(\d+(?:\.\d+)*)\s*pesos""#)
        .expect("Invalid ARS amount regex")
});

static FRACTION_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)andes-money-amount__fraction[^>]*>([0-9.]+)<")
        .expect("Invalid fraction amount regex")
});

static STATIC_IMAGE_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\ssrc="(https://http2\.mlstatic\.com[^"]+)""#)
        .expect("Invalid image src regex")
});

static STATIC_IMAGE_DATA_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)data-src="(https://http2\.mlstatic\.com[^"]+)""#)
        .expect("Invalid image data-src regex")
});

static CARD_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)poly-component__location[^>]*>([^<]+)<")
        .expect("Invalid card location regex")
});

static SEPARATOR_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"(?i)separator">({})</li>"#, YEAR_PATTERN))
        .expect("Invalid separator year regex")
});

static LIST_ITEM_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)>({})</li>", YEAR_PATTERN))
        .expect("Invalid list item year regex")
});

static LIST_ITEM_KM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)>([\d.]+)\s*Km</li>")
        .expect("Invalid list item km regex")
});

static SEPARATOR_KM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)separator">([\d.]+)\s*Km"#)
        .expect("Invalid separator km regex")
});

/// `["2020","45.000 Km"]` entries emitted outside the cards.
static YEAR_MILEAGE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\[\s*"(\d{4})"\s*,\s*"([\d.]+)\s*km"\s*\]"#)
        .expect("Invalid year/mileage pair regex")
});

static CARD_TITLE_RULES: [FieldRule; 1] = [
    FieldRule { name: "card title", pattern: &CARD_TITLE, transform: cleaned_group },
];

static USD_PRICE_RULES: [FieldRule; 2] = [
    FieldRule { name: "dollars aria-label", pattern: &USD_ARIA_AMOUNT, transform: raw_group },
    FieldRule { name: "amount fraction", pattern: &FRACTION_AMOUNT, transform: raw_group },
];

static ARS_PRICE_RULES: [FieldRule; 2] = [
    FieldRule { name: "pesos aria-label", pattern: &ARS_ARIA_AMOUNT, transform: raw_group },
    FieldRule { name: "amount fraction", pattern: &FRACTION_AMOUNT, transform: raw_group },
];

static THUMBNAIL_RULES: [FieldRule; 2] = [
    FieldRule { name: "static image src", pattern: &STATIC_IMAGE_SRC, transform: raw_group },
    FieldRule { name: "static image data-src", pattern: &STATIC_IMAGE_DATA_SRC, transform: raw_group },
];

static LOCATION_RULES: [FieldRule; 1] = [
    FieldRule { name: "card location", pattern: &CARD_LOCATION, transform: cleaned_group },
];

static YEAR_RULES: [FieldRule; 2] = [
    FieldRule { name: "separator year", pattern: &SEPARATOR_YEAR, transform: raw_group },
    FieldRule { name: "list item year", pattern: &LIST_ITEM_YEAR, transform: raw_group },
];

static MILEAGE_RULES: [FieldRule; 2] = [
    FieldRule { name: "list item km", pattern: &LIST_ITEM_KM, transform: mileage_group },
    FieldRule { name: "separator km", pattern: &SEPARATOR_KM, transform: mileage_group },
];

const USD_CARD_MARKERS: [&str; 3] = ["US$", "U$S", "dólares"];

fn mileage_group(caps: &Captures<'_>) -> Option<String> {
    let raw = caps.get(1)?.as_str();
    raw.chars()
        .any(|c| c.is_ascii_digit())
        .then(|| normalize_amount(raw).to_string())
}

/// Year and mileage text emitted for one card outside the card markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearMileagePair {
    pub year: String,
    pub mileage: String,
}

/// All year/mileage pairs in document order.
pub fn parse_year_mileage_pairs(html: &str) -> Vec<YearMileagePair> {
    YEAR_MILEAGE_PAIR
        .captures_iter(html)
        .map(|caps| YearMileagePair {
            year: caps[1].to_string(),
            mileage: normalize_amount(&caps[2]).to_string(),
        })
        .collect()
}

/// Card fragments in document order. A card ends at the `</li>` closing the
/// result item it sits in, capped by the next card start and the end of the
/// results list.
pub fn split_cards(html: &str) -> Vec<&str> {
    let starts: Vec<usize> = CARD_START.find_iter(html).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let next_card = starts.get(i + 1).copied().unwrap_or(html.len());
            let list_end = RESULTS_LIST_END
                .find_at(html, start)
                .map(|m| m.end())
                .unwrap_or(html.len());
            let end = enclosing_item_end(html, start, next_card.min(list_end));
            &html[start..end]
        })
        .collect()
}

/// Offset just past the first unbalanced `</li>` in `html[start..bound]`,
/// or `bound` when the card is not inside a list item.
fn enclosing_item_end(html: &str, start: usize, bound: usize) -> usize {
    let mut depth = 0usize;
    for caps in LIST_ITEM_TAG.captures_iter(&html[start..bound]) {
        let Some(tag) = caps.get(0) else { continue };
        if caps.get(1).is_none() {
            depth += 1;
        } else if depth == 0 {
            return start + tag.end();
        } else {
            depth -= 1;
        }
    }
    bound
}

struct QualifiedCard<'a> {
    index: usize,
    id: ListingId,
    fragment: &'a str,
}

impl ListingExtractor {
    /// Records for every distinct listing on a search page, in document
    /// order, capped at the configured maximum.
    ///
    /// Never fails: a page without recognizable cards yields an empty list.
    pub fn extract_search_results(&self, html: &str) -> Vec<ListingRecord> {
        let fragments = split_cards(html);
        if fragments.is_empty() {
            if !html.trim().is_empty() {
                warn!(html_len = html.len(), "no listing cards found on search page");
            }
            return Vec::new();
        }

        let cards = self.qualify_cards(&fragments);

        let pairs = parse_year_mileage_pairs(html);
        let pairs_aligned = !pairs.is_empty() && pairs.len() == cards.len();
        if !pairs.is_empty() && !pairs_aligned {
            warn!(
                pairs = pairs.len(),
                cards = cards.len(),
                "year/mileage pairs do not line up with cards, ignoring them"
            );
        }

        let records: Vec<ListingRecord> = cards
            .into_iter()
            .enumerate()
            .take(self.max_results())
            .map(|(position, card)| {
                let pair = if pairs_aligned { pairs.get(position) } else { None };
                self.extract_card(card, pair)
            })
            .collect();

        debug!(
            html_len = html.len(),
            fragments = fragments.len(),
            records = records.len(),
            "extracted search results"
        );
        records
    }

    /// Cards carrying a listing id, first occurrence of each id only.
    fn qualify_cards<'a>(&self, fragments: &[&'a str]) -> Vec<QualifiedCard<'a>> {
        let mut seen = HashSet::new();
        let mut cards = Vec::new();

        for (index, fragment) in fragments.iter().enumerate() {
            match self.card_id(fragment) {
                Ok(Some(id)) => {
                    if seen.insert(id.clone()) {
                        cards.push(QualifiedCard { index, id, fragment });
                    } else {
                        debug!(card_index = index, listing_id = %id, "skipping duplicate card");
                    }
                }
                Ok(None) => debug!(card_index = index, "card without listing id"),
                Err(e) => warn!(card_index = index, fragment_len = fragment.len(), "skipping card: {}", e),
            }
        }

        cards
    }

    fn card_id(&self, fragment: &str) -> Result<Option<ListingId>, ExtractError> {
        let digits = self
            .card_anchor_id
            .captures(fragment)
            .or_else(|| self.card_id.captures(fragment))
            .and_then(|caps| caps.get(1));

        match digits {
            Some(m) => self.parse_id(m.as_str()).map(Some),
            None => Ok(None),
        }
    }

    fn extract_card(&self, card: QualifiedCard<'_>, pair: Option<&YearMileagePair>) -> ListingRecord {
        let QualifiedCard { index, id, fragment } = card;

        let title = first_match(&CARD_TITLE_RULES, fragment)
            .unwrap_or_else(|| format!("{} {}", PLACEHOLDER_TITLE_PREFIX, id));

        let (currency, rules) = if USD_CARD_MARKERS.iter().any(|m| fragment.contains(m)) {
            (Currency::Usd, &USD_PRICE_RULES)
        } else {
            (Currency::Ars, &ARS_PRICE_RULES)
        };
        let price = first_match(rules, fragment)
            .map(|amount| normalize_amount(&amount))
            .unwrap_or(0);

        let thumbnail = first_match(&THUMBNAIL_RULES, fragment);
        let location = first_match(&LOCATION_RULES, fragment).and_then(|text| parse_location(&text));

        let local_year = first_match(&YEAR_RULES, fragment);
        let local_mileage = first_match(&MILEAGE_RULES, fragment);
        if pair.is_some() && (local_year.is_none() || local_mileage.is_none()) {
            debug!(card_index = index, listing_id = %id, "filling year/mileage from positional pair");
        }
        let year = local_year
            .or_else(|| pair.map(|p| p.year.clone()))
            .unwrap_or_default();
        let mileage = local_mileage
            .or_else(|| pair.map(|p| p.mileage.clone()))
            .unwrap_or_default();

        let condition = condition_from_mileage(mileage.parse().ok());
        let brand = self.brands().find(&title).unwrap_or_default().to_string();
        let attributes = canonical_attributes(&brand, &title, &year, &mileage);

        ListingRecord {
            permalink: self.permalink(&id),
            id,
            title,
            price,
            currency,
            thumbnail,
            condition,
            seller: None,
            location,
            attributes,
        }
    }
}
