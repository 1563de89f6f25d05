use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use super::{ListingExtractor, ListingSource};
use crate::config::MarketplaceConfig;
use crate::error::{FetchError, MarketplaceError};
use crate::mapper::VehicleMapper;
use crate::models::{ListingId, ListingRecord, VehiclePayload};
use crate::utils::http::{create_client, fetch_with_retry};

/// Characters `encodeURIComponent` leaves alone.
const QUERY_SLUG: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Search path segment: percent-encoded query with spaces as dashes.
pub fn search_slug(query: &str) -> String {
    utf8_percent_encode(query.trim(), QUERY_SLUG)
        .to_string()
        .replace("%20", "-")
}

pub struct MercadoLibreClient {
    client: Client,
    config: MarketplaceConfig,
    extractor: ListingExtractor,
    mapper: VehicleMapper,
}

impl MercadoLibreClient {
    pub fn new(config: MarketplaceConfig) -> anyhow::Result<Self> {
        let client = create_client(&config)?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: MarketplaceConfig) -> anyhow::Result<Self> {
        let extractor = ListingExtractor::new(&config)?;
        let mapper = VehicleMapper::new(extractor.brands().clone());
        Ok(Self { client, config, extractor, mapper })
    }

    pub fn extractor(&self) -> &ListingExtractor {
        &self.extractor
    }

    pub fn search_url(&self, query: &str) -> Result<String, MarketplaceError> {
        let slug = search_slug(query);
        if slug.is_empty() {
            return Err(MarketplaceError::EmptyQuery);
        }
        let mut url = Url::parse(&self.config.search_base_url)?;
        url.set_path(&format!("/{}", slug));
        Ok(url.to_string())
    }

    /// Resolve a listing URL (or bare id), fetch it and map it to a vehicle.
    pub async fn load_from_url(&self, url: &str) -> Result<VehiclePayload, MarketplaceError> {
        let id = self
            .extractor
            .extract_item_id(url)
            .ok_or_else(|| MarketplaceError::InvalidItemUrl(url.to_string()))?;
        let record = self.fetch_listing(&id).await?;
        Ok(self.mapper.map(&record))
    }

    /// Current price of a listing; `None` once the listing is gone.
    pub async fn current_price(&self, id: &ListingId) -> Result<Option<u64>, MarketplaceError> {
        match self.fetch_listing(id).await {
            Ok(record) => Ok(Some(record.price)),
            Err(MarketplaceError::Fetch(FetchError::NotFound { url })) => {
                warn!(listing_id = %id, url, "listing no longer available");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ListingSource for MercadoLibreClient {
    async fn fetch_listing(&self, id: &ListingId) -> Result<ListingRecord, MarketplaceError> {
        let url = self.extractor.permalink(id);
        info!(listing_id = %id, "Fetching listing {}", url);

        let html = fetch_with_retry(&self.client, &url, self.config.max_retries).await?;
        Ok(self.extractor.extract_detail(&html, id.as_str())?)
    }

    async fn search(&self, query: &str) -> Result<Vec<ListingRecord>, MarketplaceError> {
        let url = self.search_url(query)?;
        info!(query, "Searching {}", url);

        let html = fetch_with_retry(&self.client, &url, self.config.max_retries).await?;
        let results = self.extractor.extract_search_results(&html);
        info!("Found {} listings for {:?}", results.len(), query);
        Ok(results)
    }

    fn source_name(&self) -> &'static str {
        "MercadoLibre"
    }
}
