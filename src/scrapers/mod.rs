use async_trait::async_trait;
use regex::Regex;

use crate::config::{MarketplaceConfig, MAX_SEARCH_RESULTS};
use crate::error::{ExtractError, MarketplaceError};
use crate::models::{ListingId, ListingRecord};
use crate::parsers::BrandMatcher;

mod detail;
mod mercadolibre;
mod search;

pub use mercadolibre::{search_slug, MercadoLibreClient};
pub use search::{parse_year_mileage_pairs, split_cards, YearMileagePair};

/// Anything that can look up listings on a marketplace.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(&self, id: &ListingId) -> Result<ListingRecord, MarketplaceError>;
    async fn search(&self, query: &str) -> Result<Vec<ListingRecord>, MarketplaceError>;
    fn source_name(&self) -> &'static str;
}

/// Pure HTML-to-record extraction for one marketplace.
///
/// Holds only immutable configuration; every call is independent.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    id_prefix: String,
    item_base_url: String,
    max_results: usize,
    brands: BrandMatcher,
    url_id: Regex,
    card_anchor_id: Regex,
    card_id: Regex,
}

impl ListingExtractor {
    pub fn new(config: &MarketplaceConfig) -> Result<Self, ExtractError> {
        let prefix = regex::escape(&config.id_prefix);
        Ok(Self {
            id_prefix: config.id_prefix.to_ascii_uppercase(),
            item_base_url: config.item_base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results.clamp(1, MAX_SEARCH_RESULTS),
            brands: BrandMatcher::new(&config.brands)?,
            url_id: Regex::new(&format!(r"(?i){}-?(\d+)", prefix))?,
            card_anchor_id: Regex::new(&format!(r#"href="[^"]*{}-(\d{{9,10}})"#, prefix))?,
            card_id: Regex::new(&format!(r"{}-(\d{{9,10}})", prefix))?,
        })
    }

    pub fn brands(&self) -> &BrandMatcher {
        &self.brands
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn parse_id(&self, raw: &str) -> Result<ListingId, ExtractError> {
        ListingId::parse(raw, &self.id_prefix)
    }

    /// Listing id embedded in any marketplace URL (or a bare id).
    pub fn extract_item_id(&self, url: &str) -> Option<ListingId> {
        let caps = self.url_id.captures(url)?;
        self.parse_id(caps.get(1)?.as_str()).ok()
    }

    /// Canonical listing URL, `<item base>/<PREFIX>-<digits>`.
    pub fn permalink(&self, id: &ListingId) -> String {
        format!("{}/{}", self.item_base_url, id.hyphenated())
    }
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new(&MarketplaceConfig::default()).expect("Invalid default marketplace config")
    }
}
