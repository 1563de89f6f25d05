use anyhow::{Context, Result};
use clap::Parser;
use scraper::{Html, Selector};
use std::fs;
use std::path::PathBuf;

use vehicle_tracker::config::Config;
use vehicle_tracker::scrapers::{parse_year_mileage_pairs, ListingExtractor};
use vehicle_tracker::utils::http::{create_client, fetch_html};

/// Inspect a marketplace page and report what the extractors see.
#[derive(Parser)]
#[command(name = "analyze_html")]
struct Args {
    /// Saved HTML file to analyze
    #[arg(long, conflicts_with = "url", required_unless_present = "url")]
    file: Option<PathBuf>,

    /// Page to fetch and analyze
    #[arg(long)]
    url: Option<String>,

    /// Listing id for detail pages (defaults to the one in --url)
    #[arg(long)]
    id: Option<String>,

    /// Where to save a fetched page
    #[arg(long)]
    save: Option<PathBuf>,
}

const MARKERS: [(&str, &str); 7] = [
    ("og:title", r#"meta[property="og:title"]"#),
    ("og:image", r#"meta[property="og:image"]"#),
    ("og:description", r#"meta[property="og:description"]"#),
    ("cards", "div.poly-card"),
    ("card titles", ".poly-component__title"),
    ("card locations", ".poly-component__location"),
    ("price fractions", ".andes-money-amount__fraction"),
];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;
    let extractor = ListingExtractor::new(&config.marketplace)?;

    let html = match (&args.file, &args.url) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(url)) => {
            println!("Fetching {}...", url);
            let client = create_client(&config.marketplace)?;
            let html = fetch_html(&client, url).await?;
            if let Some(save) = &args.save {
                fs::write(save, &html)?;
                println!("Saved to {}", save.display());
            }
            html
        }
        (None, None) => anyhow::bail!("pass --file or --url"),
    };

    println!("Page size: {} bytes", html.len());

    let document = Html::parse_document(&html);
    for (label, selector) in MARKERS {
        if let Ok(selector) = Selector::parse(selector) {
            println!("{:<18} {}", label, document.select(&selector).count());
        }
    }
    println!("{:<18} {}", "year/km pairs", parse_year_mileage_pairs(&html).len());

    let results = extractor.extract_search_results(&html);
    if !results.is_empty() {
        println!("\nSearch results ({}):", results.len());
        for record in &results {
            println!("  {}\t{} {}\t{}", record.id, record.currency, record.price, record.title);
        }
        return Ok(());
    }

    let id = args
        .id
        .as_deref()
        .or(args.url.as_deref())
        .and_then(|raw| extractor.extract_item_id(raw));
    match id {
        Some(id) => {
            let record = extractor.extract_detail(&html, id.as_str())?;
            println!("\nDetail record:\n{}", serde_json::to_string_pretty(&record)?);
        }
        None => println!("\nNo cards found and no listing id given; pass --id for detail pages"),
    }

    Ok(())
}
