use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExtractError;

/// Canonical marketplace identifier, `<PREFIX><digits>` (e.g. `MLA1234567890`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Accepts `MLA123`, `MLA-123`, `mla123` and bare digits.
    pub fn parse(raw: &str, prefix: &str) -> Result<Self, ExtractError> {
        let trimmed = raw.trim();
        let rest = match trimmed.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(prefix) => &trimmed[prefix.len()..],
            _ => trimmed,
        };
        let digits = rest.strip_prefix('-').unwrap_or(rest);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ExtractError::InvalidListingId(raw.to_string()));
        }

        Ok(Self(format!("{}{}", prefix.to_ascii_uppercase(), digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix without the prefix.
    pub fn digits(&self) -> &str {
        let start = self
            .0
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(self.0.len());
        &self.0[start..]
    }

    /// Permalink form with a separator after the prefix (`MLA-123`).
    pub fn hyphenated(&self) -> String {
        let digits = self.digits();
        let prefix = &self.0[..self.0.len() - digits.len()];
        format!("{}-{}", prefix, digits)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "ARS")]
    Ars,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ars => "ARS",
            Currency::Usd => "USD",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ARS" => Some(Currency::Ars),
            "USD" => Some(Currency::Usd),
            _ => None,
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::from_code(s).ok_or_else(|| format!("unknown currency {:?}, expected ARS or USD", s))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingCondition {
    New,
    #[default]
    Used,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    /// Always 0: listing pages do not expose the numeric seller id.
    pub id: u64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeKey {
    Brand,
    Model,
    VehicleYear,
    Kilometers,
}

impl AttributeKey {
    pub fn label(&self) -> &'static str {
        match self {
            AttributeKey::Brand => "Marca",
            AttributeKey::Model => "Modelo",
            AttributeKey::VehicleYear => "Año",
            AttributeKey::Kilometers => "Kilómetros",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: AttributeKey,
    pub label: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: AttributeKey, value: impl Into<String>) -> Self {
        Self {
            key,
            label: key.label().to_string(),
            value: value.into(),
        }
    }
}

/// One listing as recovered from marketplace HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: ListingId,
    pub title: String,
    /// Native currency units; 0 means the price could not be read.
    pub price: u64,
    pub currency: Currency,
    pub thumbnail: Option<String>,
    pub condition: ListingCondition,
    pub permalink: String,
    pub seller: Option<Seller>,
    pub location: Option<Location>,
    pub attributes: Vec<Attribute>,
}

impl ListingRecord {
    /// Value of an attribute, `None` when absent or empty.
    pub fn attribute(&self, key: AttributeKey) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Brand, model, year and mileage in that order, always all four.
pub fn canonical_attributes(brand: &str, model: &str, year: &str, mileage: &str) -> Vec<Attribute> {
    vec![
        Attribute::new(AttributeKey::Brand, brand),
        Attribute::new(AttributeKey::Model, model),
        Attribute::new(AttributeKey::VehicleYear, year),
        Attribute::new(AttributeKey::Kilometers, mileage),
    ]
}
