use once_cell::sync::Lazy;
use regex::Regex;

use super::{cleaned_group, first_match, meta_property_regex, raw_group, FieldRule};
use crate::config::default_brands;
use crate::error::ExtractError;
use crate::models::Location;

/// Plausible vehicle years, 1900-2029.
pub(crate) const YEAR_PATTERN: &str = r"19\d{2}|20[0-2]\d";

static YEAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b({})\b", YEAR_PATTERN))
        .expect("Invalid year regex")
});

static OG_TITLE: Lazy<Regex> = Lazy::new(|| meta_property_regex("og:title", false));
static OG_TITLE_REVERSED: Lazy<Regex> = Lazy::new(|| meta_property_regex("og:title", true));
static OG_IMAGE: Lazy<Regex> = Lazy::new(|| meta_property_regex("og:image", false));
static OG_IMAGE_REVERSED: Lazy<Regex> = Lazy::new(|| meta_property_regex("og:image", true));
static OG_DESCRIPTION: Lazy<Regex> = Lazy::new(|| meta_property_regex("og:description", false));
static OG_DESCRIPTION_REVERSED: Lazy<Regex> =
    Lazy::new(|| meta_property_regex("og:description", true));

static TITLE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<title[^>]*>([^<]+)</title>")
        .expect("Invalid title tag regex")
});

static DEALER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Concesionario\s+([^•<]+)")
        .expect("Invalid dealer regex")
});

static NICKNAME_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"nickname"\s*:\s*"([^"]+)""#)
        .expect("Invalid nickname regex")
});

pub static SOCIAL_TITLE_RULES: [FieldRule; 2] = [
    FieldRule { name: "og:title", pattern: &OG_TITLE, transform: cleaned_group },
    FieldRule { name: "og:title (content first)", pattern: &OG_TITLE_REVERSED, transform: cleaned_group },
];

pub static SOCIAL_IMAGE_RULES: [FieldRule; 2] = [
    FieldRule { name: "og:image", pattern: &OG_IMAGE, transform: raw_group },
    FieldRule { name: "og:image (content first)", pattern: &OG_IMAGE_REVERSED, transform: raw_group },
];

pub static SOCIAL_DESCRIPTION_RULES: [FieldRule; 2] = [
    FieldRule { name: "og:description", pattern: &OG_DESCRIPTION, transform: cleaned_group },
    FieldRule { name: "og:description (content first)", pattern: &OG_DESCRIPTION_REVERSED, transform: cleaned_group },
];

pub static PAGE_TITLE_RULES: [FieldRule; 1] = [
    FieldRule { name: "title tag", pattern: &TITLE_TAG, transform: cleaned_group },
];

pub static SELLER_RULES: [FieldRule; 2] = [
    FieldRule { name: "dealer label", pattern: &DEALER_LABEL, transform: cleaned_group },
    FieldRule { name: "nickname field", pattern: &NICKNAME_FIELD, transform: cleaned_group },
];

pub fn parse_social_title(html: &str) -> Option<String> {
    first_match(&SOCIAL_TITLE_RULES, html)
}

pub fn parse_social_image(html: &str) -> Option<String> {
    first_match(&SOCIAL_IMAGE_RULES, html)
}

pub fn parse_social_description(html: &str) -> Option<String> {
    first_match(&SOCIAL_DESCRIPTION_RULES, html)
}

pub fn parse_page_title(html: &str) -> Option<String> {
    first_match(&PAGE_TITLE_RULES, html)
}

pub fn parse_seller_name(html: &str) -> Option<String> {
    first_match(&SELLER_RULES, html)
}

/// First plausible vehicle year (1900-2029) in the text.
pub fn parse_year(text: &str) -> Option<u16> {
    YEAR_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// `"City - State"`; a missing half stays empty.
pub fn parse_location(text: &str) -> Option<Location> {
    let text = text.trim();
    let (city, state) = if let Some(state) = text.strip_prefix('-') {
        ("", state)
    } else if let Some(city) = text.strip_suffix('-') {
        (city, "")
    } else {
        text.split_once(" - ").unwrap_or((text, ""))
    };

    let (city, state) = (city.trim(), state.trim());
    if city.is_empty() && state.is_empty() {
        return None;
    }
    Some(Location { city: city.to_string(), state: state.to_string() })
}

/// Case-insensitive alternation over known brand spellings.
#[derive(Debug, Clone)]
pub struct BrandMatcher {
    regex: Option<Regex>,
}

impl BrandMatcher {
    pub fn new(brands: &[String]) -> Result<Self, ExtractError> {
        let alternation = brands
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Ok(Self { regex: None });
        }
        let regex = Regex::new(&format!(r"(?i)\b({})\b", alternation))?;
        Ok(Self { regex: Some(regex) })
    }

    /// The brand as spelled in the text.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .as_ref()?
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for BrandMatcher {
    fn default() -> Self {
        Self::new(&default_brands()).expect("Invalid default brand patterns")
    }
}
