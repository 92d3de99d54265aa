// src/main.rs
mod extractors;
mod page;
mod store;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scraper::Html;

use extractors::listing::ListingExtractor;
use store::ListingStore;
use utils::error::StorageError;
use utils::AppError;

/// Command Line Interface for the idealista listing tracker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the JSON file holding the saved listings
    #[arg(long, default_value = "listings.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a listing page and save the extracted record
    Capture {
        /// Listing URL, or path of a locally saved HTML page
        source: String,

        /// Canonical listing URL, when capturing from a saved file
        #[arg(long)]
        url: Option<String>,

        /// Print the captured record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the saved records
    List,

    /// Remove a saved record by id
    Remove {
        /// Id of the record to remove
        id: String,
    },

    /// Export the collection as CSV
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import records from an exported CSV file
    Import {
        /// Path of the CSV file to import
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::debug!("Starting with args: {:?}", args);

    // 3. Open the listing store
    let store = ListingStore::new(&args.store)?;

    match args.command {
        Command::Capture { source, url, json } => {
            let html = page::client::load_page(&source).await?;
            tracing::info!("Loaded listing page ({} bytes)", html.len());

            let page_url = url.as_deref().unwrap_or(&source);
            let document = Html::parse_document(&html);
            let record = ListingExtractor::new().extract(&document, page_url);

            if json {
                let rendered = serde_json::to_string_pretty(&record)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                println!("{}", rendered);
            }

            tracing::info!("Captured \"{}\" ({})", record.title, record.price);
            store.add(record)?;
        }

        Command::List => {
            let records = store.list()?;
            if records.is_empty() {
                println!("No saved listings.");
            } else {
                for record in &records {
                    println!(
                        "{}  {} | {} | {}",
                        record.id, record.title, record.price, record.url
                    );
                }
                println!("{} listing(s)", records.len());
            }
        }

        Command::Remove { id } => {
            store.remove(&id)?;
            tracing::info!("Removed listing: {}", id);
        }

        Command::Export { output } => {
            let rendered = store.export_csv()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    tracing::info!("Exported listings to: {}", path.display());
                }
                None => println!("{}", rendered),
            }
        }

        Command::Import { input } => {
            let text = std::fs::read_to_string(&input)?;
            let report = store.import_csv(&text)?;
            println!(
                "Imported {} listing(s), {} failed row(s)",
                report.success, report.failed
            );
        }
    }

    Ok(())
}
