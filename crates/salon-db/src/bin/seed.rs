//! # Seed Data Generator
//!
//! Populates the database with a small salon for development: categories,
//! staff, retail products with stock, services, and a few sample sales.
//!
//! ## Usage
//! ```bash
//! # Seed the database named in salon.toml / SALON_DB_PATH
//! cargo run -p salon-db --bin seed
//!
//! # Specify database path
//! cargo run -p salon-db --bin seed -- --db ./data/salon_dev.db
//!
//! # More detail
//! RUST_LOG=debug cargo run -p salon-db --bin seed
//! ```

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use salon_core::inventory::StockReceipt;
use salon_core::reports::{commission_payouts, profitability, stock_valuation};
use salon_core::{BatchKind, Cart, Category, Employee, Item, Money};
use salon_db::{Database, StoreConfig};

/// (id, name, commission %, roles allowed; empty = anyone)
const CATEGORIES: &[(&str, &str, i64, &[&str])] = &[
    ("hair", "Hair Services", 50, &["stylist", "colorist"]),
    ("color", "Color Services", 45, &["colorist"]),
    ("nails", "Nail Services", 55, &["nail_technician"]),
    ("retail", "Retail Products", 10, &[]),
];

/// (id, name, role)
const STAFF: &[(&str, &str, &str)] = &[
    ("emp-ana", "Ana", "stylist"),
    ("emp-bo", "Bo", "colorist"),
    ("emp-cy", "Cy", "nail_technician"),
];

/// (id, name, category, price cents)
const SERVICES: &[(&str, &str, &str, i64)] = &[
    ("svc-cut", "Haircut", "hair", 4000),
    ("svc-blowout", "Blowout", "hair", 3500),
    ("svc-color", "Full Color", "color", 9500),
    ("svc-mani", "Manicure", "nails", 2500),
];

/// (id, name, price cents, reorder threshold, [(qty, unit cost cents, days ago)])
const PRODUCTS: &[(&str, &str, i64, i64, &[(i64, i64, i64)])] = &[
    ("prd-shampoo", "Shampoo 300ml", 2500, 5, &[(24, 1000, 30), (24, 1100, 7)]),
    ("prd-conditioner", "Conditioner 300ml", 2200, 5, &[(20, 900, 21)]),
    ("prd-gel", "Styling Gel", 1500, 3, &[(6, 450, 14), (4, 500, 2)]),
    ("prd-polish", "Nail Polish", 1200, 10, &[(12, 300, 10)]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,salon=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Salon POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: from config)");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = StoreConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }
    let db_config = config.db_config();
    info!(store = %config.store.name, path = %db_config.database_path.display(), "Seeding");

    let db = Database::new(db_config).await?;

    if !db.items().list().await?.is_empty() {
        warn!("Database already has items, skipping seed. Delete the file to regenerate.");
        return Ok(());
    }

    for (id, name, rate, roles) in CATEGORIES {
        let rate = Decimal::from(*rate);
        db.items()
            .insert_category(&Category {
                id: id.to_string(),
                name: name.to_string(),
                commission_rate: rate,
                salon_owner_rate: Decimal::ONE_HUNDRED - rate,
            })
            .await?;
        for role in *roles {
            db.items().allow_role(id, role).await?;
        }
    }

    for (id, name, role) in STAFF {
        db.staff()
            .insert(&Employee {
                id: id.to_string(),
                name: name.to_string(),
                role: role.to_string(),
                active: true,
            })
            .await?;
    }

    for (id, name, category, price) in SERVICES {
        db.items()
            .insert(&Item {
                id: id.to_string(),
                name: name.to_string(),
                category_id: Some(category.to_string()),
                price: Money::from_cents(*price),
                is_service: true,
                stock: 0,
                average_cost: Money::zero(),
                reorder_threshold: 0,
            })
            .await?;
    }

    let now = Utc::now();
    for (id, name, price, threshold, receipts) in PRODUCTS {
        db.items()
            .insert(&Item {
                id: id.to_string(),
                name: name.to_string(),
                category_id: Some("retail".to_string()),
                price: Money::from_cents(*price),
                is_service: false,
                stock: 0,
                average_cost: Money::zero(),
                reorder_threshold: *threshold,
            })
            .await?;

        for (quantity, cost, days_ago) in *receipts {
            db.stock()
                .receive(
                    id,
                    StockReceipt {
                        quantity: *quantity,
                        unit_cost: Money::from_cents(*cost),
                        kind: BatchKind::Purchase,
                        date: now - Duration::days(*days_ago),
                        notes: Some("seed".to_string()),
                    },
                )
                .await?;
        }
    }

    // Ana is senior: she keeps 60% of haircuts instead of the category 50%
    db.staff()
        .set_service_rate("emp-ana", "svc-cut", Decimal::from(60))
        .await?;

    let settlement = config.settlement_config();
    let sample_carts: &[&[(&str, &str, i64)]] = &[
        &[("svc-cut", "emp-ana", 1), ("prd-shampoo", "emp-ana", 2)],
        &[("svc-color", "emp-bo", 1), ("prd-conditioner", "emp-bo", 1)],
        &[("svc-mani", "emp-cy", 1), ("prd-polish", "emp-cy", 3)],
        &[("svc-blowout", "emp-ana", 1), ("prd-gel", "emp-ana", 8)],
    ];
    for lines in sample_carts {
        let mut cart = Cart::new();
        for (item, employee, quantity) in *lines {
            cart.add_line(*item, *employee, *quantity)?;
        }
        db.checkout().checkout(&cart, &settlement).await?;
    }

    let sales = db
        .sales()
        .list_between(now - Duration::days(1), now + Duration::days(1))
        .await?;
    let summary = profitability(&sales);
    info!(
        sales = summary.sales,
        revenue = %summary.revenue,
        cogs = %summary.cogs,
        commission = %summary.commission,
        owner_net = %summary.owner_net,
        "Sample sales settled"
    );
    for payout in commission_payouts(&sales) {
        info!(employee = %payout.employee_id, commission = %payout.commission, "Payout");
    }

    let items = db.items().list().await?;
    let ledger = db.inventory().ledger().await?;
    for valuation in stock_valuation(&items, &ledger) {
        info!(item = %valuation.name, stock = valuation.stock, value = %valuation.value, "Stock");
    }
    for item in db.items().low_stock().await? {
        warn!(item = %item.name, stock = item.stock, "Below reorder threshold");
    }

    info!("Seed complete");
    Ok(())
}
