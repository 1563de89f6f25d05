use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::models::{ManualVehicle, Vehicle, VehiclePayload, VehicleUpdate};

mod sqlite;
pub use sqlite::SqliteStorage;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn migrate(&self) -> Result<()>;
    /// Stores the vehicle with its initial price history entry.
    async fn insert_vehicle(&self, payload: &VehiclePayload) -> Result<i64>;
    async fn insert_manual(&self, vehicle: &ManualVehicle) -> Result<i64>;
    async fn get_vehicle(&self, id: i64) -> Result<Option<Vehicle>>;
    async fn find_by_item_id(&self, item_id: &str) -> Result<Option<Vehicle>>;
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>>;
    /// Returns true when the price changed and a history entry was appended.
    async fn update_price(&self, id: i64, price: u64, synced_at: DateTime<Utc>) -> Result<bool>;
    /// Applies the edits; a price change is recorded in the history.
    /// Returns whether the price changed.
    async fn update_vehicle(&self, id: i64, update: &VehicleUpdate, at: DateTime<Utc>) -> Result<bool>;
    async fn delete_vehicle(&self, id: i64) -> Result<bool>;
    async fn import_from_json(&self, json_path: &Path) -> Result<usize>;
}
