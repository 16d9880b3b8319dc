//! # Seed Data Generator
//!
//! Populates the database with demo promotion codes for development.
//!
//! ## Usage
//! ```bash
//! # Generate 100 individual codes (default)
//! cargo run -p permacode-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p permacode-db --bin seed -- --count 1000
//!
//! # Specify database path and tenant
//! cargo run -p permacode-db --bin seed -- --db ./data/permacode.db --tenant shop-2
//! ```
//!
//! ## Generated Codes
//! - One global code `WELCOME` for promotion `demo-global`
//! - N individual codes `DEMO-00001`, `DEMO-00002`, … for `demo-individual`

use std::env;

use permacode_core::{CodeUpsert, Context, DEFAULT_TENANT_ID};
use permacode_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const GLOBAL_PROMOTION: &str = "demo-global";
const INDIVIDUAL_PROMOTION: &str = "demo-individual";

/// Codes written per upsert call.
const BATCH_SIZE: usize = 250;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,permacode=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 100;
    let mut db_path = String::from("./permacode_dev.db");
    let mut tenant_id = String::from(DEFAULT_TENANT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(100);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Permacode Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Individual codes to generate (default: 100)");
                println!("  -d, --db <PATH>      Database file path (default: ./permacode_dev.db)");
                println!("  -t, --tenant <ID>    Tenant to seed (default: {DEFAULT_TENANT_ID})");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, tenant = %tenant_id, count, "Seeding promotion codes");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let (embedded, applied) = db.migration_status().await?;
    info!(embedded, applied, "Schema ready");

    let repo = db.codes();
    let ctx = Context::system(tenant_id);

    let existing = repo.count(&ctx).await?;
    if existing > 0 {
        warn!(
            existing,
            "Tenant already has promotion codes, skipping seed (delete the database to regenerate)"
        );
        db.close().await;
        return Ok(());
    }

    let start = std::time::Instant::now();

    repo.save(&[CodeUpsert::global(GLOBAL_PROMOTION, "WELCOME")], &ctx)
        .await?;

    let codes: Vec<CodeUpsert> = (1..=count)
        .map(|n| CodeUpsert::individual(INDIVIDUAL_PROMOTION, format!("DEMO-{n:05}")))
        .collect();

    let mut generated = 0;
    for batch in codes.chunks(BATCH_SIZE) {
        generated += repo.save(batch, &ctx).await?.len();
        info!(generated, "Seed progress");
    }

    info!(
        generated,
        elapsed = ?start.elapsed(),
        total = repo.count(&ctx).await?,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
