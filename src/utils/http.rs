use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::MarketplaceConfig;
use crate::error::FetchError;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Client that looks like a desktop browser to the marketplace.
pub fn create_client(config: &MarketplaceConfig) -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.accept_language)?);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let client = ClientBuilder::new()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .pool_max_idle_per_host(6)
        .build()?;

    Ok(client)
}

/// GET a page and classify the outcome: 404 is terminal, any other
/// non-2xx is a transient status error.
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(FetchError::Connection)?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound { url: url.to_string() });
    }
    if !status.is_success() {
        return Err(FetchError::Status { status: status.as_u16(), url: url.to_string() });
    }

    let html = response.text().await.map_err(FetchError::Body)?;
    debug!(url, html_len = html.len(), "fetched page");
    Ok(html)
}

/// `fetch_html` with exponential back-off on transient failures.
pub async fn fetch_with_retry(client: &Client, url: &str, max_retries: u32) -> Result<String, FetchError> {
    let max_retries = max_retries.max(1);
    let mut attempts = 0;

    loop {
        match fetch_html(client, url).await {
            Ok(html) => return Ok(html),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                attempts += 1;
                if attempts >= max_retries {
                    error!("Failed to fetch {} after {} attempts: {}", url, attempts, e);
                    return Err(e);
                }
                let delay = Duration::from_secs(2u64.pow(attempts));
                warn!("{}; retrying in {:?} (attempt {}/{})", e, delay, attempts + 1, max_retries);
                sleep(delay).await;
            }
        }
    }
}
