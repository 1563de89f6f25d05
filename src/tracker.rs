use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::VehiclePayload;
use crate::storage::Storage;

/// Outcome of writing a freshly read marketplace price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRefresh {
    Changed,
    Unchanged,
    /// The page gave no readable price; the stored one was kept.
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Added(i64),
    Refreshed { id: i64, refresh: PriceRefresh },
}

/// Store a freshly read price. A price of 0 means the page showed none and is never written.
pub async fn refresh_price(
    storage: &dyn Storage,
    vehicle_id: i64,
    price: u64,
    synced_at: DateTime<Utc>,
) -> Result<PriceRefresh> {
    if price == 0 {
        warn!(vehicle_id, "price not readable, keeping stored value");
        return Ok(PriceRefresh::Unreadable);
    }
    if storage.update_price(vehicle_id, price, synced_at).await? {
        Ok(PriceRefresh::Changed)
    } else {
        Ok(PriceRefresh::Unchanged)
    }
}

/// Start tracking a listing, or refresh its price when it is already tracked.
pub async fn track_listing(storage: &dyn Storage, payload: &VehiclePayload) -> Result<TrackOutcome> {
    let item_id = &payload.marketplace.item_id;
    match storage.find_by_item_id(item_id).await? {
        Some(existing) => {
            debug!(vehicle_id = existing.id, item_id = %item_id, "listing already tracked");
            let refresh = refresh_price(storage, existing.id, payload.price, Utc::now()).await?;
            Ok(TrackOutcome::Refreshed { id: existing.id, refresh })
        }
        None => Ok(TrackOutcome::Added(storage.insert_vehicle(payload).await?)),
    }
}
