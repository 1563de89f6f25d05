use chrono::{DateTime, Datelike, Utc};
use regex::RegexBuilder;

use crate::models::{
    AttributeKey, ListingCondition, ListingRecord, MarketplaceData, SellerRef, VehicleCondition,
    VehiclePayload, VehicleSource,
};
use crate::parsers::{digits_only, BrandMatcher};

/// Turns extracted listings into vehicle-creation payloads.
#[derive(Debug, Clone, Default)]
pub struct VehicleMapper {
    brands: BrandMatcher,
}

impl VehicleMapper {
    pub fn new(brands: BrandMatcher) -> Self {
        Self { brands }
    }

    pub fn map(&self, record: &ListingRecord) -> VehiclePayload {
        self.map_at(record, Utc::now())
    }

    /// Mapping with an explicit sync time; the year default also comes from it.
    pub fn map_at(&self, record: &ListingRecord, now: DateTime<Utc>) -> VehiclePayload {
        let (brand, model) = self.brand_and_model(record);

        let year = record
            .attribute(AttributeKey::VehicleYear)
            .and_then(|y| y.parse::<i32>().ok())
            .unwrap_or_else(|| now.year());
        let mileage = record
            .attribute(AttributeKey::Kilometers)
            .map(digits_only)
            .unwrap_or(0);
        let condition = match record.condition {
            ListingCondition::New => VehicleCondition::ZeroKm,
            ListingCondition::Used => VehicleCondition::Used,
        };

        let marketplace = MarketplaceData {
            item_id: record.id.to_string(),
            url: record.permalink.clone(),
            title: record.title.clone(),
            thumbnail: record.thumbnail.clone(),
            seller: record.seller.as_ref().map(|s| SellerRef {
                id: s.id,
                nickname: s.display_name.clone(),
            }),
            location: record.location.clone(),
            permalink: Some(record.permalink.clone()),
            last_sync: Some(now),
        };

        VehiclePayload {
            brand,
            model,
            year,
            mileage,
            price: record.price,
            currency: record.currency,
            condition,
            source: VehicleSource::Marketplace,
            marketplace,
        }
    }

    /// Brand and model, re-deriving both from the title when the model
    /// attribute is missing or is just the title again.
    fn brand_and_model(&self, record: &ListingRecord) -> (String, String) {
        let mut brand = record.attribute(AttributeKey::Brand).unwrap_or_default().to_string();
        let model = record.attribute(AttributeKey::Model).unwrap_or_default();

        if !model.is_empty() && model != record.title {
            return (brand, model.to_string());
        }

        let title = record.title.as_str();
        let Some(found) = self.brands.find(title) else {
            return (brand, title.to_string());
        };

        if brand.is_empty() {
            brand = found.to_string();
        }
        (brand, strip_leading_brand(title, found))
    }
}

/// Map with the default brand list, stamped with the current time.
pub fn map_listing_to_vehicle(record: &ListingRecord) -> VehiclePayload {
    VehicleMapper::default().map(record)
}

/// Remove `brand` plus following whitespace from the start of `title`.
fn strip_leading_brand(title: &str, brand: &str) -> String {
    let pattern = format!(r"^{}\s+", regex::escape(brand));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace(title, "").trim().to_string(),
        Err(_) => title.to_string(),
    }
}
