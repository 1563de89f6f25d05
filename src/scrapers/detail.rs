use tracing::debug;

use super::ListingExtractor;
use crate::error::ExtractError;
use crate::models::{
    canonical_attributes, Currency, ListingCondition, ListingRecord, Seller,
    PLACEHOLDER_TITLE_PREFIX,
};
use crate::parsers::{
    detect_currency, parse_condition_and_mileage, parse_page_title, parse_seller_name,
    parse_social_description, parse_social_image, parse_social_title, parse_year,
    split_title_price, strip_branding, strip_title_decoration,
};

#[derive(Debug, Default)]
struct TitlePrice {
    title: String,
    price: u64,
    currency: Currency,
}

impl ListingExtractor {
    /// Build a record from one listing page.
    ///
    /// Only an unusable identifier is an error; every missing field falls
    /// back to its default.
    pub fn extract_detail(&self, html: &str, listing_id: &str) -> Result<ListingRecord, ExtractError> {
        let id = self.parse_id(listing_id)?;

        let social_title = parse_social_title(html);
        let TitlePrice { title, price, currency } = title_and_price(social_title.as_deref(), html);
        let thumbnail = parse_social_image(html);

        let (condition, mileage) = match parse_social_description(html) {
            Some(description) => parse_condition_and_mileage(&description),
            None => (ListingCondition::Used, 0),
        };

        let year = parse_year(&title);
        let brand = self.brands().find(&title).unwrap_or_default().to_string();
        let seller = parse_seller_name(html).map(|display_name| Seller { id: 0, display_name });

        debug!(
            listing_id = %id,
            html_len = html.len(),
            has_social_title = social_title.is_some(),
            has_thumbnail = thumbnail.is_some(),
            has_seller = seller.is_some(),
            price,
            "extracted listing detail"
        );

        let title = if title.is_empty() {
            format!("{} {}", PLACEHOLDER_TITLE_PREFIX, id)
        } else {
            title
        };

        let year = year.map(|y| y.to_string()).unwrap_or_default();
        let mileage = match (condition, mileage) {
            (ListingCondition::New, _) => "0".to_string(),
            (ListingCondition::Used, 0) => String::new(),
            (ListingCondition::Used, km) => km.to_string(),
        };

        // The model carries the full title; the mapper separates brand from model.
        let attributes = canonical_attributes(&brand, &title, &year, &mileage);

        Ok(ListingRecord {
            permalink: self.permalink(&id),
            id,
            title,
            price,
            currency,
            thumbnail,
            condition,
            seller,
            location: None,
            attributes,
        })
    }
}

/// Social title first (with price suffix), then the page `<title>`.
fn title_and_price(social_title: Option<&str>, html: &str) -> TitlePrice {
    let mut result = TitlePrice::default();

    if let Some(source) = social_title {
        result.currency = detect_currency(source);
        match split_title_price(source) {
            Some((title, price)) => {
                result.title = title;
                result.price = price;
            }
            None => result.title = strip_branding(source),
        }
    }

    if result.title.is_empty() {
        if let Some(page_title) = parse_page_title(html) {
            result.title = strip_title_decoration(&page_title);
        }
    }

    result
}
