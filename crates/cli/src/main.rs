//! Chatcart CLI - database migrations, catalog seeding and reports.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (schema + session table)
//! chatcart migrate
//!
//! # Seed or update the catalog from a YAML file
//! chatcart seed products catalog.yaml
//!
//! # Inventory value per currency and stock alerts
//! chatcart report inventory --low-stock 10
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use chatcart_core::StockStatus;

mod commands;

#[derive(Parser)]
#[command(name = "chatcart")]
#[command(author, version, about = "Chatcart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from YAML files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Print reports
    Report {
        #[command(subcommand)]
        report: ReportKind,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert or update categories and products by slug
    Products {
        /// Path to the YAML catalog file
        file: String,
    },
}

#[derive(Subcommand)]
enum ReportKind {
    /// Inventory value per currency and low-stock alerts
    Inventory {
        /// Stock at or below this level is reported as low
        #[arg(long, default_value_t = StockStatus::DEFAULT_LOW_STOCK_THRESHOLD)]
        low_stock: i32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(&file).await?,
        },
        Commands::Report { report } => match report {
            ReportKind::Inventory { low_stock } => commands::report::inventory(low_stock).await?,
        },
    }
    Ok(())
}
