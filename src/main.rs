use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use vehicle_tracker::config::Config;
use vehicle_tracker::models::{
    Currency, ListingId, ManualVehicle, Vehicle, VehicleCondition, VehicleFilter, VehicleUpdate,
};
use vehicle_tracker::scrapers::{ListingSource, MercadoLibreClient};
use vehicle_tracker::storage::{SqliteStorage, Storage};
use vehicle_tracker::tracker::{refresh_price, track_listing, PriceRefresh, TrackOutcome};

#[derive(Parser)]
#[command(name = "vehicle-tracker")]
#[command(about = "Track vehicle listings and their price history")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "VEHICLE_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a single listing and print it as JSON
    Item {
        #[arg(value_name = "URL_OR_ID")]
        target: String,
    },
    /// Search the marketplace and print the results
    Search {
        #[arg(value_name = "QUERY", num_args = 1.., required = true)]
        query: Vec<String>,
    },
    /// Start tracking a listing (refreshes the price if already tracked)
    Add {
        #[arg(value_name = "URL_OR_ID")]
        target: String,
    },
    /// Track a vehicle entered by hand
    AddManual {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        year: i32,
        #[arg(long, default_value_t = 0)]
        mileage: u64,
        #[arg(long)]
        price: u64,
        #[arg(long, default_value = "ARS")]
        currency: Currency,
        /// `0km` or `used`
        #[arg(long, default_value = "used")]
        condition: VehicleCondition,
    },
    /// Edit a tracked vehicle; a new price is added to its history
    Update {
        id: i64,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        mileage: Option<u64>,
        #[arg(long)]
        price: Option<u64>,
        #[arg(long)]
        currency: Option<Currency>,
        #[arg(long)]
        condition: Option<VehicleCondition>,
    },
    /// List tracked vehicles
    List(ListArgs),
    /// Show the price history of a tracked vehicle
    History { id: i64 },
    /// Stop tracking a vehicle
    Remove { id: i64 },
    /// Import vehicles from a JSON export
    Import { path: PathBuf },
    /// Refresh prices of all tracked marketplace listings
    Sync,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    year_min: Option<i32>,
    #[arg(long)]
    year_max: Option<i32>,
    #[arg(long)]
    km_min: Option<u64>,
    #[arg(long)]
    km_max: Option<u64>,
    #[arg(long)]
    price_min: Option<u64>,
    #[arg(long)]
    price_max: Option<u64>,
    #[arg(long)]
    condition: Option<VehicleCondition>,
}

impl From<ListArgs> for VehicleFilter {
    fn from(args: ListArgs) -> Self {
        Self {
            brand: args.brand,
            model: args.model,
            year_min: args.year_min,
            year_max: args.year_max,
            mileage_min: args.km_min,
            mileage_max: args.km_max,
            price_min: args.price_min,
            price_max: args.price_max,
            condition: args.condition,
        }
    }
}

fn init_logging(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("vehicle_tracker=info".parse()?);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let config = Arc::new(Config::load_from(cli.config.as_deref())?);
    let marketplace = MercadoLibreClient::new(config.marketplace.clone())?;

    match cli.command {
        Commands::Item { target } => {
            let id = resolve_id(&marketplace, &target)?;
            let record = marketplace.fetch_listing(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Search { query } => {
            let query = query.join(" ");
            let results = marketplace.search(&query).await?;
            for record in &results {
                println!(
                    "{}\t{} {}\t{}\t{}",
                    record.id, record.currency, record.price, record.title, record.permalink
                );
            }
            info!("{} results", results.len());
        }
        Commands::Add { target } => {
            let storage = open_storage(&config).await?;
            let payload = marketplace.load_from_url(&target).await?;

            let item_id = &payload.marketplace.item_id;

            match track_listing(storage.as_ref(), &payload).await? {
                TrackOutcome::Added(id) => {
                    info!("Tracking {} {} ({}) as #{}", payload.brand, payload.model, item_id, id);
                }
                TrackOutcome::Refreshed { id, refresh } => match refresh {
                    PriceRefresh::Changed => info!("{} already tracked as #{}, price updated", item_id, id),
                    PriceRefresh::Unchanged => info!("{} already tracked as #{}", item_id, id),
                    PriceRefresh::Unreadable => {
                        warn!("{} already tracked as #{}; no readable price, keeping stored value", item_id, id)
                    }
                },
            }
        }
        Commands::AddManual { brand, model, year, mileage, price, currency, condition } => {
            let storage = open_storage(&config).await?;
            let vehicle = ManualVehicle { brand, model, year, mileage, price, currency, condition };
            let id = storage.insert_manual(&vehicle).await?;
            info!("Tracking {} {} as #{}", vehicle.brand, vehicle.model, id);
        }
        Commands::Update { id, brand, model, year, mileage, price, currency, condition } => {
            let update = VehicleUpdate { brand, model, year, mileage, price, currency, condition };
            if update.is_empty() {
                anyhow::bail!("nothing to update, pass at least one field");
            }
            let storage = open_storage(&config).await?;
            if storage.update_vehicle(id, &update, Utc::now()).await? {
                info!("Vehicle #{} updated, price change recorded", id);
            } else {
                info!("Vehicle #{} updated", id);
            }
        }
        Commands::List(args) => {
            let storage = open_storage(&config).await?;
            let filter = VehicleFilter::from(args);
            for vehicle in storage.list_vehicles().await?.iter().filter(|v| filter.matches(v)) {
                print_vehicle(vehicle);
            }
        }
        Commands::History { id } => {
            let storage = open_storage(&config).await?;
            let vehicle = storage
                .get_vehicle(id)
                .await?
                .with_context(|| format!("vehicle #{} not found", id))?;
            print_vehicle(&vehicle);
            for entry in &vehicle.price_history {
                println!(
                    "  {}\t{} {}\t{}",
                    entry.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    vehicle.currency,
                    entry.price,
                    entry.notes.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Remove { id } => {
            let storage = open_storage(&config).await?;
            if storage.delete_vehicle(id).await? {
                info!("Removed vehicle #{}", id);
            } else {
                warn!("No vehicle #{}", id);
            }
        }
        Commands::Import { path } => {
            let storage = open_storage(&config).await?;
            let imported = storage.import_from_json(&path).await?;
            info!("Imported {} vehicles", imported);
        }
        Commands::Sync => {
            let storage = open_storage(&config).await?;
            sync_prices(&marketplace, storage.as_ref(), config.sync_concurrency).await?;
        }
    }

    Ok(())
}

async fn open_storage(config: &Config) -> Result<Arc<SqliteStorage>> {
    let storage = SqliteStorage::new(&config.database_path).await?;
    storage.migrate().await?;
    Ok(Arc::new(storage))
}

fn resolve_id(marketplace: &MercadoLibreClient, target: &str) -> Result<ListingId> {
    marketplace
        .extractor()
        .extract_item_id(target)
        .with_context(|| format!("not a MercadoLibre listing: {}", target))
}

fn print_vehicle(vehicle: &Vehicle) {
    println!(
        "#{}\t{} {} {}\t{} km\t{}\t{} {}\t{}",
        vehicle.id,
        vehicle.brand,
        vehicle.model,
        vehicle.year,
        vehicle.mileage,
        vehicle.condition,
        vehicle.currency,
        vehicle.price,
        vehicle.marketplace.as_ref().map(|m| m.url.as_str()).unwrap_or("")
    );
}

/// Refresh every tracked marketplace listing, a few requests at a time.
async fn sync_prices(marketplace: &MercadoLibreClient, storage: &dyn Storage, concurrency: usize) -> Result<()> {
    let tracked: Vec<(i64, ListingId)> = storage
        .list_vehicles()
        .await?
        .into_iter()
        .filter_map(|v| {
            let item_id = v.marketplace?.item_id;
            match marketplace.extractor().parse_id(&item_id) {
                Ok(id) => Some((v.id, id)),
                Err(e) => {
                    warn!("Skipping vehicle #{}: {}", v.id, e);
                    None
                }
            }
        })
        .collect();

    info!("--- Syncing {} listings at {} ---", tracked.len(), Local::now().format("%Y-%m-%d %H:%M:%S"));

    let results: Vec<_> = stream::iter(tracked)
        .map(|(vehicle_id, id)| async move {
            let price = marketplace.current_price(&id).await;
            (vehicle_id, id, price)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut updated = 0;
    for (vehicle_id, id, price) in results {
        match price {
            Ok(Some(price)) => {
                if refresh_price(storage, vehicle_id, price, Utc::now()).await? == PriceRefresh::Changed {
                    info!("{} price changed to {}", id, price);
                    updated += 1;
                }
            }
            Ok(None) => warn!("{}: listing no longer available", id),
            Err(e) => error!("Failed to sync {}: {}", id, e),
        }
    }

    info!("Sync completed, {} prices updated", updated);
    Ok(())
}
