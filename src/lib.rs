pub mod config;
pub mod error;
pub mod mapper;
pub mod models;
pub mod parsers;
pub mod scrapers;
pub mod storage;
pub mod tracker;
pub mod utils;

pub use crate::config::{Config, MarketplaceConfig};
pub use crate::error::{ExtractError, FetchError, MarketplaceError};
pub use crate::mapper::{map_listing_to_vehicle, VehicleMapper};
pub use crate::models::{ListingId, ListingRecord, VehiclePayload};
pub use crate::scrapers::{ListingExtractor, ListingSource, MercadoLibreClient};
