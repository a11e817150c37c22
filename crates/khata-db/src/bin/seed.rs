//! # Seed Data Generator
//!
//! Populates the database with the product catalog and demo marts for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed catalog + demo marts into the default dev database
//! cargo run -p khata-db --bin seed
//!
//! # Specify database path
//! cargo run -p khata-db --bin seed -- --db ./data/khata.db
//!
//! # Catalog only, no demo marts
//! cargo run -p khata-db --bin seed -- --no-demo
//! ```
//!
//! ## Generated Data
//! - The full product catalog (ghee, mustard oil, honey SKUs) with the
//!   current default prices
//! - Two demo marts, each with a refill and a sale recorded through the
//!   ledger engine, so the dashboard has realistic state to display

use std::collections::BTreeMap;
use std::env;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use khata_core::{
    ledger, CommissionRate, Mart, Money, OversellPolicy, Product, RefillEntry, SalesEntry,
};
use khata_db::{Database, DbConfig};

/// The product catalog: (key, name, size label, default price in rupees).
const CATALOG: &[(&str, &str, &str, i64)] = &[
    ("gir500", "Gir Cow Ghee", "500ml", 900),
    ("gir1000", "Gir Cow Ghee", "1L", 1_700),
    ("mustard500", "Cold-Pressed Mustard Oil", "500ml", 450),
    ("mustard1000", "Cold-Pressed Mustard Oil", "1L", 850),
    ("honey250", "Raw Honey", "250g", 600),
    ("honey500", "Raw Honey", "500g", 1_100),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./khata_dev.db");
    let mut seed_demo = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--no-demo" => {
                seed_demo = false;
            }
            "--help" | "-h" => {
                println!("Khata Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./khata_dev.db)");
                println!("      --no-demo      Seed the catalog only, skip demo marts");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, "Seeding Khata database");

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    // Catalog first: idempotent-ish, skip if anything is already there
    let existing = db.products().count().await?;
    if existing > 0 {
        info!(existing, "Catalog already seeded, skipping");
    } else {
        for &(key, name, size_label, rupees) in CATALOG {
            db.products()
                .insert(&Product {
                    key: key.to_string(),
                    name: name.to_string(),
                    size_label: size_label.to_string(),
                    default_unit_price: Money::from_rupees(rupees),
                })
                .await?;
        }
        info!(count = CATALOG.len(), "Catalog seeded");
    }

    if !seed_demo {
        info!("Demo marts skipped (--no-demo)");
        return Ok(());
    }

    if db.marts().count().await? > 0 {
        info!("Marts already present, skipping demo data");
        return Ok(());
    }

    let catalog = db.products().load_catalog().await?;

    for (name, mobile, sector, address, commission_pct) in [
        ("Bismillah Mart", "03001234567", "F-7", "Shop 12, Jinnah Market", Some(5.0)),
        ("Al-Madina Store", "03331234567", "G-9", "Main Road, Karachi Company", None),
    ] {
        let commission = commission_pct.map(CommissionRate::from_percentage);
        let mart = Mart::new(name, mobile, sector, address, commission);

        // A delivery...
        let mut lines = BTreeMap::new();
        lines.insert("gir500".to_string(), 12);
        lines.insert("mustard1000".to_string(), 6);
        let mart = ledger::apply_refill(
            &mart,
            RefillEntry::new(Utc::now().date_naive(), lines),
        )?;

        // ...and a sale against it, priced through the engine
        let mut lines = BTreeMap::new();
        lines.insert("gir500".to_string(), 4);
        let total = ledger::compute_sale_total(&lines, |key| {
            ledger::resolve_unit_price(&mart, &catalog, key)
        });
        let sale = SalesEntry::new(Utc::now().date_naive(), lines, total.amount);
        let mart = ledger::apply_sale(&mart, sale, OversellPolicy::FloorAtZero)?;

        db.marts().insert(&mart).await?;
        info!(
            mart = name,
            stock_gir500 = mart.stock_of("gir500"),
            outstanding = %mart.total_outstanding(),
            commission_due = %mart.commission_due().unwrap_or_else(Money::zero),
            "Demo mart seeded"
        );
    }

    info!("Seed complete");
    Ok(())
}
