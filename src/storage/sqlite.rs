use async_trait::async_trait;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::models::{
    Currency, Location, ManualVehicle, MarketplaceData, PriceHistoryEntry, SellerRef, Vehicle,
    VehicleCondition, VehiclePayload, VehicleSource, VehicleUpdate,
};
use crate::storage::Storage;

const PRICE_UPDATE_NOTE: &str = "Price update";

const VEHICLE_COLUMNS: &str = "id, brand, model, year, mileage, price, currency, condition, source, \
    ml_item_id, ml_url, ml_title, ml_thumbnail, ml_seller, ml_location, ml_permalink, ml_last_sync, \
    created_at, updated_at";

pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .context("Failed to open SQLite database")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory SQLite database")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection lock poisoned"))
    }
}

/// One vehicle row as written, independent of where it came from.
struct NewRow<'a> {
    brand: &'a str,
    model: &'a str,
    year: i32,
    mileage: u64,
    price: u64,
    currency: Currency,
    condition: VehicleCondition,
    source: VehicleSource,
    marketplace: Option<&'a MarketplaceData>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("value {} does not fit in SQLite INTEGER", value))
}

fn insert_row(conn: &Connection, row: &NewRow<'_>) -> Result<i64> {
    let ml = row.marketplace;
    let seller = ml
        .and_then(|m| m.seller.as_ref())
        .map(serde_json::to_string)
        .transpose()?;
    let location = ml
        .and_then(|m| m.location.as_ref())
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO vehicles (brand, model, year, mileage, price, currency, condition, source,
            ml_item_id, ml_url, ml_title, ml_thumbnail, ml_seller, ml_location, ml_permalink,
            ml_last_sync, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            row.brand,
            row.model,
            row.year,
            to_sql_int(row.mileage)?,
            to_sql_int(row.price)?,
            row.currency.code(),
            row.condition.as_str(),
            row.source.as_str(),
            ml.map(|m| m.item_id.as_str()),
            ml.map(|m| m.url.as_str()),
            ml.map(|m| m.title.as_str()),
            ml.and_then(|m| m.thumbnail.as_deref()),
            seller,
            location,
            ml.and_then(|m| m.permalink.as_deref()),
            ml.and_then(|m| m.last_sync).map(|t| t.to_rfc3339()),
            row.created_at.to_rfc3339(),
            row.updated_at.to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

fn insert_history(
    conn: &Connection,
    vehicle_id: i64,
    price: u64,
    date: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO price_history (vehicle_id, price, date, notes) VALUES (?1, ?2, ?3, ?4)",
        params![vehicle_id, to_sql_int(price)?, date.to_rfc3339(), notes],
    )?;
    Ok(())
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json<T: for<'de> Deserialize<'de>>(idx: usize, value: Option<String>) -> rusqlite::Result<Option<T>> {
    value
        .map(|v| serde_json::from_str(&v))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_vehicle(row: &Row<'_>) -> rusqlite::Result<Vehicle> {
    let item_id: Option<String> = row.get(9)?;
    let marketplace = match item_id {
        Some(item_id) => {
            let last_sync: Option<String> = row.get(16)?;
            Some(MarketplaceData {
                item_id,
                url: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
                title: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                thumbnail: row.get(12)?,
                seller: parse_json::<SellerRef>(13, row.get(13)?)?,
                location: parse_json::<Location>(14, row.get(14)?)?,
                permalink: row.get(15)?,
                last_sync: last_sync.map(|t| parse_timestamp(16, &t)).transpose()?,
            })
        }
        None => None,
    };

    let currency: String = row.get(6)?;
    let condition: String = row.get(7)?;
    let source: String = row.get(8)?;
    let created_at: String = row.get(17)?;
    let updated_at: String = row.get(18)?;

    Ok(Vehicle {
        id: row.get(0)?,
        brand: row.get(1)?,
        model: row.get(2)?,
        year: row.get(3)?,
        mileage: row.get::<_, i64>(4)?.max(0) as u64,
        price: row.get::<_, i64>(5)?.max(0) as u64,
        currency: Currency::from_code(&currency).unwrap_or_default(),
        condition: VehicleCondition::from_str_lossy(&condition),
        source: VehicleSource::from_str_lossy(&source),
        marketplace,
        created_at: parse_timestamp(17, &created_at)?,
        updated_at: parse_timestamp(18, &updated_at)?,
        price_history: Vec::new(),
    })
}

fn load_history(conn: &Connection, vehicle_id: i64) -> Result<Vec<PriceHistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, price, date, notes FROM price_history WHERE vehicle_id = ?1 ORDER BY date ASC, id ASC",
    )?;
    let entries = stmt
        .query_map(params![vehicle_id], |row| {
            let date: String = row.get(2)?;
            Ok(PriceHistoryEntry {
                id: row.get(0)?,
                price: row.get::<_, i64>(1)?.max(0) as u64,
                date: parse_timestamp(2, &date)?,
                notes: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

fn load_vehicles(conn: &Connection, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Vehicle>> {
    let sql = format!(
        "SELECT {} FROM vehicles {} ORDER BY created_at DESC, id DESC",
        VEHICLE_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut vehicles = stmt
        .query_map(args, row_to_vehicle)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for vehicle in &mut vehicles {
        vehicle.price_history = load_history(conn, vehicle.id)?;
    }
    Ok(vehicles)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Wrapped { vehicles: Vec<ImportedVehicle> },
    Bare(Vec<ImportedVehicle>),
}

/// One exported vehicle. Older exports use Spanish keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedVehicle {
    #[serde(alias = "marca")]
    brand: String,
    #[serde(alias = "modelo")]
    model: String,
    #[serde(alias = "año", alias = "ano")]
    year: i32,
    #[serde(alias = "kilometraje")]
    mileage: u64,
    #[serde(alias = "precio")]
    price: u64,
    #[serde(default, alias = "moneda")]
    currency: Option<String>,
    #[serde(alias = "condicion")]
    condition: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, alias = "mercadolibre")]
    marketplace: Option<MarketplaceData>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    price_history: Vec<ImportedPrice>,
}

#[derive(Debug, Deserialize)]
struct ImportedPrice {
    price: u64,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
    #[serde(default)]
    notes: Option<String>,
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vehicles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                brand TEXT NOT NULL,
                model TEXT NOT NULL,
                year INTEGER NOT NULL,
                mileage INTEGER NOT NULL DEFAULT 0,
                price INTEGER NOT NULL DEFAULT 0,
                currency TEXT NOT NULL DEFAULT 'ARS',
                condition TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT 'manual',
                ml_item_id TEXT UNIQUE,
                ml_url TEXT,
                ml_title TEXT,
                ml_thumbnail TEXT,
                ml_seller TEXT,
                ml_location TEXT,
                ml_permalink TEXT,
                ml_last_sync TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vehicle_id INTEGER NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
                price INTEGER NOT NULL,
                date TEXT NOT NULL,
                notes TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_price_history_vehicle ON price_history(vehicle_id);",
        )?;

        info!("Database migration completed");
        Ok(())
    }

    async fn insert_vehicle(&self, payload: &VehiclePayload) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let id = insert_row(
            &tx,
            &NewRow {
                brand: &payload.brand,
                model: &payload.model,
                year: payload.year,
                mileage: payload.mileage,
                price: payload.price,
                currency: payload.currency,
                condition: payload.condition,
                source: payload.source,
                marketplace: Some(&payload.marketplace),
                created_at: now,
                updated_at: now,
            },
        )
        .with_context(|| format!("Failed to store listing {}", payload.marketplace.item_id))?;

        let note = match payload.source {
            VehicleSource::Marketplace => "Initial price (marketplace)",
            VehicleSource::Manual => "Initial price",
        };
        insert_history(&tx, id, payload.price, now, Some(note))?;

        tx.commit()?;
        debug!(vehicle_id = id, item_id = %payload.marketplace.item_id, "stored vehicle");
        Ok(id)
    }

    async fn insert_manual(&self, vehicle: &ManualVehicle) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let id = insert_row(
            &tx,
            &NewRow {
                brand: &vehicle.brand,
                model: &vehicle.model,
                year: vehicle.year,
                mileage: vehicle.mileage,
                price: vehicle.price,
                currency: vehicle.currency,
                condition: vehicle.condition,
                source: VehicleSource::Manual,
                marketplace: None,
                created_at: now,
                updated_at: now,
            },
        )
        .with_context(|| format!("Failed to store {} {}", vehicle.brand, vehicle.model))?;
        insert_history(&tx, id, vehicle.price, now, Some("Initial price"))?;

        tx.commit()?;
        debug!(vehicle_id = id, "stored manual vehicle");
        Ok(id)
    }

    async fn get_vehicle(&self, id: i64) -> Result<Option<Vehicle>> {
        let conn = self.conn()?;
        Ok(load_vehicles(&conn, "WHERE id = ?1", &[&id])?.into_iter().next())
    }

    async fn find_by_item_id(&self, item_id: &str) -> Result<Option<Vehicle>> {
        let conn = self.conn()?;
        Ok(load_vehicles(&conn, "WHERE ml_item_id = ?1", &[&item_id])?.into_iter().next())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let conn = self.conn()?;
        load_vehicles(&conn, "", &[])
    }

    async fn update_price(&self, id: i64, price: u64, synced_at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current: Option<i64> = tx
            .query_row("SELECT price FROM vehicles WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        let Some(current) = current else {
            bail!("vehicle {} not found", id);
        };

        let new_price = to_sql_int(price)?;
        let changed = current != new_price;
        if changed {
            tx.execute(
                "UPDATE vehicles SET price = ?1, updated_at = ?2, ml_last_sync = ?2 WHERE id = ?3",
                params![new_price, synced_at.to_rfc3339(), id],
            )?;
            insert_history(&tx, id, price, synced_at, Some(PRICE_UPDATE_NOTE))?;
        } else {
            tx.execute(
                "UPDATE vehicles SET ml_last_sync = ?1 WHERE id = ?2",
                params![synced_at.to_rfc3339(), id],
            )?;
        }

        tx.commit()?;
        Ok(changed)
    }

    async fn update_vehicle(&self, id: i64, update: &VehicleUpdate, at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current: Option<i64> = tx
            .query_row("SELECT price FROM vehicles WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        let Some(current) = current else {
            bail!("vehicle {} not found", id);
        };

        let price = update.price.map(to_sql_int).transpose()?;
        let mileage = update.mileage.map(to_sql_int).transpose()?;
        tx.execute(
            "UPDATE vehicles SET
                brand = COALESCE(?1, brand),
                model = COALESCE(?2, model),
                year = COALESCE(?3, year),
                mileage = COALESCE(?4, mileage),
                price = COALESCE(?5, price),
                currency = COALESCE(?6, currency),
                condition = COALESCE(?7, condition),
                updated_at = ?8
             WHERE id = ?9",
            params![
                update.brand,
                update.model,
                update.year,
                mileage,
                price,
                update.currency.map(|c| c.code()),
                update.condition.map(|c| c.as_str()),
                at.to_rfc3339(),
                id,
            ],
        )?;

        let changed = price.map_or(false, |p| p != current);
        if let (true, Some(new_price)) = (changed, update.price) {
            insert_history(&tx, id, new_price, at, Some(PRICE_UPDATE_NOTE))?;
        }

        tx.commit()?;
        Ok(changed)
    }

    async fn delete_vehicle(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM price_history WHERE vehicle_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM vehicles WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    async fn import_from_json(&self, json_path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(json_path)
            .with_context(|| format!("Failed to read {}", json_path.display()))?;
        let vehicles = match serde_json::from_str::<ImportFile>(&content)
            .with_context(|| format!("Invalid vehicle export in {}", json_path.display()))?
        {
            ImportFile::Wrapped { vehicles } | ImportFile::Bare(vehicles) => vehicles,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut imported = 0;

        for vehicle in &vehicles {
            if let Some(ml) = &vehicle.marketplace {
                let exists: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM vehicles WHERE ml_item_id = ?1",
                        params![ml.item_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_some() {
                    debug!(item_id = %ml.item_id, "skipping already tracked listing");
                    continue;
                }
            }

            let id = insert_row(
                &tx,
                &NewRow {
                    brand: &vehicle.brand,
                    model: &vehicle.model,
                    year: vehicle.year,
                    mileage: vehicle.mileage,
                    price: vehicle.price,
                    currency: vehicle
                        .currency
                        .as_deref()
                        .and_then(Currency::from_code)
                        .unwrap_or_default(),
                    condition: VehicleCondition::from_str_lossy(&vehicle.condition),
                    source: vehicle
                        .source
                        .as_deref()
                        .map(VehicleSource::from_str_lossy)
                        .unwrap_or_default(),
                    marketplace: vehicle.marketplace.as_ref(),
                    created_at: vehicle.created_at.unwrap_or(now),
                    updated_at: vehicle.updated_at.unwrap_or(now),
                },
            )?;

            for entry in &vehicle.price_history {
                insert_history(&tx, id, entry.price, entry.date.unwrap_or(now), entry.notes.as_deref())?;
            }
            imported += 1;
        }

        tx.commit()?;
        info!("Imported {} of {} vehicles from {}", imported, vehicles.len(), json_path.display());
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tokio_test::block_on;

    fn storage() -> SqliteStorage {
        let storage = SqliteStorage::in_memory().unwrap();
        block_on(storage.migrate()).unwrap();
        storage
    }

    fn payload(item_id: &str, price: u64) -> VehiclePayload {
        VehiclePayload {
            brand: "Toyota".into(),
            model: "Corolla 2020".into(),
            year: 2020,
            mileage: 45_000,
            price,
            currency: Currency::Ars,
            condition: VehicleCondition::Used,
            source: VehicleSource::Marketplace,
            marketplace: MarketplaceData {
                item_id: item_id.into(),
                url: format!("https://auto.mercadolibre.com.ar/{}", item_id),
                title: "Toyota Corolla 2020".into(),
                thumbnail: None,
                seller: Some(SellerRef { id: 0, nickname: "AUTOS SUR".into() }),
                location: Some(Location { city: "Palermo".into(), state: "Capital Federal".into() }),
                permalink: None,
                last_sync: None,
            },
        }
    }

    #[test]
    fn insert_writes_initial_history() {
        let storage = storage();
        let id = block_on(storage.insert_vehicle(&payload("MLA1000000001", 15_000_000))).unwrap();

        let vehicle = block_on(storage.get_vehicle(id)).unwrap().unwrap();
        assert_eq!(vehicle.price, 15_000_000);
        assert_eq!(vehicle.price_history.len(), 1);
        assert_eq!(vehicle.price_history[0].notes.as_deref(), Some("Initial price (marketplace)"));

        let ml = vehicle.marketplace.unwrap();
        assert_eq!(ml.seller, Some(SellerRef { id: 0, nickname: "AUTOS SUR".into() }));
        assert_eq!(ml.location.unwrap().state, "Capital Federal");
    }

    #[test]
    fn price_history_only_grows_on_change() {
        let storage = storage();
        let id = block_on(storage.insert_vehicle(&payload("MLA1000000001", 100))).unwrap();
        let later = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert!(!block_on(storage.update_price(id, 100, later)).unwrap());
        assert!(block_on(storage.update_price(id, 120, later)).unwrap());

        let vehicle = block_on(storage.find_by_item_id("MLA1000000001")).unwrap().unwrap();
        let prices: Vec<u64> = vehicle.price_history.iter().map(|e| e.price).collect();
        assert_eq!(prices, vec![100, 120]);
        assert_eq!(vehicle.marketplace.unwrap().last_sync, Some(later));
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let storage = storage();
        block_on(storage.insert_vehicle(&payload("MLA1000000001", 1))).unwrap();
        assert!(block_on(storage.insert_vehicle(&payload("MLA1000000001", 2))).is_err());
    }

    #[test]
    fn update_unknown_vehicle_fails() {
        let storage = storage();
        assert!(block_on(storage.update_price(99, 1, Utc::now())).is_err());
    }

    #[test]
    fn delete_removes_vehicle() {
        let storage = storage();
        let id = block_on(storage.insert_vehicle(&payload("MLA1000000001", 1))).unwrap();
        assert!(block_on(storage.delete_vehicle(id)).unwrap());
        assert!(!block_on(storage.delete_vehicle(id)).unwrap());
        assert!(block_on(storage.list_vehicles()).unwrap().is_empty());
    }

    fn manual(price: u64) -> ManualVehicle {
        ManualVehicle {
            brand: "Fiat".into(),
            model: "Cronos".into(),
            year: 2022,
            mileage: 18_000,
            price,
            currency: Currency::Ars,
            condition: VehicleCondition::Used,
        }
    }

    fn write_export(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}.json", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn manual_vehicle_gets_manual_history_note() {
        let storage = storage();
        let id = block_on(storage.insert_manual(&manual(14_000_000))).unwrap();

        let vehicle = block_on(storage.get_vehicle(id)).unwrap().unwrap();
        assert_eq!(vehicle.source, VehicleSource::Manual);
        assert!(vehicle.marketplace.is_none());
        assert_eq!(vehicle.price_history.len(), 1);
        assert_eq!(vehicle.price_history[0].notes.as_deref(), Some("Initial price"));
    }

    #[test]
    fn update_edits_fields_and_logs_price_changes() {
        let storage = storage();
        let id = block_on(storage.insert_manual(&manual(14_000_000))).unwrap();
        let later = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();

        let edit = VehicleUpdate { mileage: Some(21_000), model: Some("Cronos Drive".into()), ..Default::default() };
        assert!(!block_on(storage.update_vehicle(id, &edit, later)).unwrap());

        let edit = VehicleUpdate { price: Some(14_000_000), ..Default::default() };
        assert!(!block_on(storage.update_vehicle(id, &edit, later)).unwrap());

        let edit = VehicleUpdate {
            price: Some(13_500_000),
            currency: Some(Currency::Usd),
            condition: Some(VehicleCondition::ZeroKm),
            ..Default::default()
        };
        assert!(block_on(storage.update_vehicle(id, &edit, later)).unwrap());

        let vehicle = block_on(storage.get_vehicle(id)).unwrap().unwrap();
        assert_eq!(vehicle.brand, "Fiat");
        assert_eq!(vehicle.model, "Cronos Drive");
        assert_eq!(vehicle.mileage, 21_000);
        assert_eq!(vehicle.price, 13_500_000);
        assert_eq!(vehicle.currency, Currency::Usd);
        assert_eq!(vehicle.condition, VehicleCondition::ZeroKm);
        assert_eq!(vehicle.updated_at, later);
        let prices: Vec<u64> = vehicle.price_history.iter().map(|e| e.price).collect();
        assert_eq!(prices, vec![14_000_000, 13_500_000]);
        assert_eq!(vehicle.price_history[1].notes.as_deref(), Some("Price update"));
    }

    #[test]
    fn update_unknown_vehicle_is_an_error() {
        let storage = storage();
        let edit = VehicleUpdate { price: Some(1), ..Default::default() };
        assert!(block_on(storage.update_vehicle(7, &edit, Utc::now())).is_err());
    }

    #[test]
    fn import_accepts_spanish_key_export() {
        let storage = storage();
        let export = r#"{"vehicles": [
            {"id": "a1", "marca": "Ford", "modelo": "Ka", "año": 2016, "kilometraje": 90000,
             "precio": 5000000, "moneda": "ARS", "condicion": "usado", "source": "manual",
             "createdAt": "2024-01-01T10:00:00.000Z", "updatedAt": "2024-03-01T10:00:00.000Z",
             "priceHistory": [{"id": "p1", "price": 5000000, "date": "2024-01-01T10:00:00.000Z", "notes": "Precio inicial"}]},
            {"id": "b2", "marca": "Toyota", "modelo": "Hilux", "año": 2024, "kilometraje": 0,
             "precio": 52000, "moneda": "USD", "condicion": "0km", "source": "mercadolibre",
             "mercadolibre": {"itemId": "MLA1500000002", "url": "https://auto.mercadolibre.com.ar/MLA-1500000002",
                              "title": "Toyota Hilux 2024", "seller": {"id": 0, "nickname": "AUTOS SUR"},
                              "location": {"city": "Rosario", "state": "Santa Fe"},
                              "lastSync": "2024-05-01T12:00:00.000Z"},
             "priceHistory": []}
        ]}"#;
        let path = write_export("vehicle_import_es", export);

        let imported = block_on(storage.import_from_json(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(imported, 2);

        let vehicles = block_on(storage.list_vehicles()).unwrap();
        let ford = vehicles.iter().find(|v| v.brand == "Ford").unwrap();
        assert_eq!((ford.model.as_str(), ford.year, ford.mileage, ford.price), ("Ka", 2016, 90_000, 5_000_000));
        assert_eq!(ford.condition, VehicleCondition::Used);
        assert_eq!(ford.source, VehicleSource::Manual);
        assert_eq!(ford.price_history[0].notes.as_deref(), Some("Precio inicial"));

        let hilux = vehicles.iter().find(|v| v.brand == "Toyota").unwrap();
        assert_eq!(hilux.currency, Currency::Usd);
        assert_eq!(hilux.condition, VehicleCondition::ZeroKm);
        assert_eq!(hilux.source, VehicleSource::Marketplace);
        let ml = hilux.marketplace.as_ref().unwrap();
        assert_eq!(ml.item_id, "MLA1500000002");
        assert_eq!(ml.location, Some(Location { city: "Rosario".into(), state: "Santa Fe".into() }));
        assert_eq!(ml.last_sync, Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
    }

    #[test]
    fn import_skips_tracked_listings() {
        let storage = storage();
        block_on(storage.insert_vehicle(&payload("MLA1000000001", 1))).unwrap();

        let export = r#"{"vehicles": [
            {"brand": "Ford", "model": "Ka", "year": 2016, "mileage": 90000, "price": 5000000,
             "condition": "used", "source": "manual",
             "priceHistory": [{"price": 5500000, "date": "2024-01-01T00:00:00Z", "notes": "Initial price"},
                              {"price": 5000000, "date": "2024-03-01T00:00:00Z"}]},
            {"brand": "Toyota", "model": "Corolla", "year": 2020, "mileage": 0, "price": 1,
             "currency": "USD", "condition": "0km", "source": "marketplace",
             "marketplace": {"itemId": "MLA1000000001", "url": "", "title": "Toyota Corolla"}}
        ]}"#;
        let path = std::env::temp_dir().join(format!("vehicle_import_{}.json", std::process::id()));
        std::fs::write(&path, export).unwrap();

        let imported = block_on(storage.import_from_json(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(imported, 1);

        let vehicles = block_on(storage.list_vehicles()).unwrap();
        assert_eq!(vehicles.len(), 2);
        let ford = vehicles.iter().find(|v| v.brand == "Ford").unwrap();
        assert_eq!(ford.source, VehicleSource::Manual);
        assert!(ford.marketplace.is_none());
        assert_eq!(ford.price_history.len(), 2);
        assert_eq!(ford.price_history[0].price, 5_500_000);
    }
}
