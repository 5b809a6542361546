//! # salon-db: Database Layer for the Salon POS
//!
//! SQLite storage for the salon: the catalog, staff and commission rates,
//! cost batches, the stock movement log, and committed sales. Business
//! rules live in `salon-core`; this crate loads their inputs, runs them
//! inside a transaction, and writes their outputs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salon POS Data Flow                              │
//! │                                                                         │
//! │  Front desk: Cart (salon-core)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     salon-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │   Services    │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Checkout      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Inventory     │    │ 001_init.sql │  │   │
//! │  │   │               │    ├───────────────┤    │              │  │   │
//! │  │   │               │◄───│ Repositories  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   StoreConfig (salon.toml + SALON_* env)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL mode)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use salon_db::{Database, StoreConfig};
//!
//! let config = StoreConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let settled = db.checkout().checkout(&cart, &config.settlement_config()).await?;
//! println!("Sale {} total {}", settled.sale.id, settled.sale.total);
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod stock;

pub use checkout::CheckoutService;
pub use config::StoreConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::inventory::InventoryRepository;
pub use repository::item::ItemRepository;
pub use repository::sale::SaleRepository;
pub use repository::settings::SettingsRepository;
pub use repository::staff::StaffRepository;
pub use stock::InventoryService;
