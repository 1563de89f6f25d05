use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Currency, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleCondition {
    #[serde(rename = "0km")]
    ZeroKm,
    #[serde(rename = "used")]
    Used,
}

impl VehicleCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCondition::ZeroKm => "0km",
            VehicleCondition::Used => "used",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "0km" => VehicleCondition::ZeroKm,
            _ => VehicleCondition::Used,
        }
    }
}

impl FromStr for VehicleCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0km" | "new" => Ok(VehicleCondition::ZeroKm),
            "used" | "usado" => Ok(VehicleCondition::Used),
            other => Err(format!("unknown condition {:?}, expected 0km or used", other)),
        }
    }
}

impl fmt::Display for VehicleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleSource {
    #[default]
    Manual,
    Marketplace,
}

impl VehicleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleSource::Manual => "manual",
            VehicleSource::Marketplace => "marketplace",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "marketplace" | "mercadolibre" => VehicleSource::Marketplace,
            _ => VehicleSource::Manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRef {
    pub id: u64,
    pub nickname: String,
}

/// Where a tracked vehicle came from on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceData {
    pub item_id: String,
    pub url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub seller: Option<SellerRef>,
    pub location: Option<Location>,
    pub permalink: Option<String>,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Vehicle-creation payload handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePayload {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: u64,
    pub price: u64,
    pub currency: Currency,
    pub condition: VehicleCondition,
    pub source: VehicleSource,
    pub marketplace: MarketplaceData,
}

/// A vehicle entered by hand, without marketplace provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualVehicle {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: u64,
    pub price: u64,
    pub currency: Currency,
    pub condition: VehicleCondition,
}

/// Field edits for a stored vehicle; `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleUpdate {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<u64>,
    pub price: Option<u64>,
    pub currency: Option<Currency>,
    pub condition: Option<VehicleCondition>,
}

impl VehicleUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryEntry {
    pub id: i64,
    pub price: u64,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A stored vehicle with its full price history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: u64,
    pub price: u64,
    pub currency: Currency,
    pub condition: VehicleCondition,
    pub source: VehicleSource,
    pub marketplace: Option<MarketplaceData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub price_history: Vec<PriceHistoryEntry>,
}

/// List filters; every set bound must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleFilter {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub mileage_min: Option<u64>,
    pub mileage_max: Option<u64>,
    pub price_min: Option<u64>,
    pub price_max: Option<u64>,
    pub condition: Option<VehicleCondition>,
}

impl VehicleFilter {
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
            min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
        }
        fn same_text(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().map_or(true, |w| w.eq_ignore_ascii_case(actual))
        }

        same_text(&self.brand, &vehicle.brand)
            && same_text(&self.model, &vehicle.model)
            && within(vehicle.year, self.year_min, self.year_max)
            && within(vehicle.mileage, self.mileage_min, self.mileage_max)
            && within(vehicle.price, self.price_min, self.price_max)
            && self.condition.map_or(true, |c| c == vehicle.condition)
    }
}
