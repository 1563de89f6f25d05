use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard ceiling on the number of records a search page yields.
pub const MAX_SEARCH_RESULTS: usize = 48;

const ENV_PREFIX: &str = "VEHICLE_TRACKER";
const DEFAULT_CONFIG_FILE: &str = "vehicle_tracker";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: String,
    pub sync_concurrency: usize,
    pub marketplace: MarketplaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub id_prefix: String,
    pub item_base_url: String,
    pub search_base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub max_results: usize,
    /// Regex fragments, one per brand spelling, joined into a single
    /// case-insensitive alternation.
    pub brands: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "vehicle_tracker.db".to_string(),
            sync_concurrency: 4,
            marketplace: MarketplaceConfig::default(),
        }
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            id_prefix: "MLA".to_string(),
            item_base_url: "https://auto.mercadolibre.com.ar".to_string(),
            search_base_url: "https://autos.mercadolibre.com.ar".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "es-AR,es;q=0.9,en;q=0.8".to_string(),
            request_timeout_seconds: 25,
            max_retries: 3,
            max_results: MAX_SEARCH_RESULTS,
            brands: default_brands(),
        }
    }
}

pub fn default_brands() -> Vec<String> {
    [
        "Honda", "Toyota", "Ford", "Chevrolet", "Volkswagen", "VW", "Fiat", "Renault",
        "Peugeot", "Citroën", "Citroen", "Nissan", "Hyundai", "Kia", "Mercedes[- ]?Benz",
        "Mercedes", "BMW", "Audi", "Jeep", "RAM", "Dodge", "Mitsubishi", "Mazda", "Subaru",
        "Suzuki", "Alfa Romeo", "Chery", "Geely", "JAC", "BYD", "Great Wall", "Haval",
    ]
    .iter()
    .map(|b| b.to_string())
    .collect()
}

impl Config {
    /// Defaults, then `vehicle_tracker.{toml,yaml,json}` if present, then
    /// `VEHICLE_TRACKER__*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate();
        Ok(config)
    }

    fn validate(&mut self) {
        if self.marketplace.max_results == 0 || self.marketplace.max_results > MAX_SEARCH_RESULTS {
            self.marketplace.max_results = MAX_SEARCH_RESULTS;
        }
        if self.sync_concurrency == 0 {
            self.sync_concurrency = 1;
        }
        if self.marketplace.max_retries == 0 {
            self.marketplace.max_retries = 1;
        }
    }
}
