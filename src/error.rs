use thiserror::Error;

/// Failures while turning marketplace HTML into listing records.
///
/// Missing fields are never errors; they resolve to defaults.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid listing identifier: {0:?}")]
    InvalidListingId(String),

    #[error("invalid extraction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Outcome of fetching a marketplace page, classified by upstream status.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("listing not found: {url}")]
    NotFound { url: String },

    #[error("HTTP error {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("connection error: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::NotFound { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::NotFound { .. } => Some(404),
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Connection(e) | FetchError::Body(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("not a MercadoLibre listing URL: {0}")]
    InvalidItemUrl(String),

    #[error("search query is empty")]
    EmptyQuery,
}

impl MarketplaceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MarketplaceError::Fetch(FetchError::NotFound { .. }))
    }
}
