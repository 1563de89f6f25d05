pub mod condition;
pub mod details;
pub mod price;

pub use condition::*;
pub use details::*;
pub use price::*;

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

/// Clean and normalize text by removing extra whitespace and decoding HTML entities
pub fn clean_text(text: &str) -> String {
    let decoded = decode_html_entities(text);
    decoded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Turns a successful match into a field value; `None` rejects the match.
pub type Transform = fn(&Captures<'_>) -> Option<String>;

/// One candidate in a field's fallback chain.
pub struct FieldRule {
    pub name: &'static str,
    pub pattern: &'static Lazy<Regex>,
    pub transform: Transform,
}

impl FieldRule {
    pub fn apply(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|caps| (self.transform)(&caps))
    }
}

/// First non-empty value produced by the rules, tried in order.
pub fn first_match(rules: &[FieldRule], text: &str) -> Option<String> {
    rules.iter().find_map(|rule| {
        let value = rule.apply(text)?;
        trace!(rule = rule.name, "field rule matched");
        Some(value)
    })
}

/// Group 1, entity-decoded and whitespace-collapsed, if non-empty.
pub fn cleaned_group(caps: &Captures<'_>) -> Option<String> {
    caps.get(1)
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
}

/// Group 1 verbatim apart from trimming, if non-empty.
pub fn raw_group(caps: &Captures<'_>) -> Option<String> {
    caps.get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `<meta property="..." content="...">` in either attribute order.
pub(crate) fn meta_property_regex(property: &str, content_first: bool) -> Regex {
    let property = regex::escape(property);
    let pattern = if content_first {
        format!(r#"(?i)<meta\b[^>]*\scontent="([^"]*)"[^>]*\sproperty="{}""#, property)
    } else {
        format!(r#"(?i)<meta\b[^>]*\sproperty="{}"[^>]*\scontent="([^"]*)""#, property)
    };
    Regex::new(&pattern).expect("Invalid meta property regex")
}
