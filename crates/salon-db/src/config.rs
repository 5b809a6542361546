//! # Store Configuration
//!
//! File and environment configuration for a salon store.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Runtime setting (settings table, costing method only)              │
//! │     Read by checkout at the moment of each sale                        │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     SALON_COSTING_METHOD=WeightedAverage                               │
//! │     SALON_TAX_RATE=825            (basis points)                       │
//! │     SALON_SHORTFALL_POLICY=reject                                      │
//! │     SALON_DB_PATH=/var/lib/salon/salon.db                              │
//! │     SALON_STORE_NAME="Main Street"                                     │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/salon-pos/salon.toml (Linux)                             │
//! │     ~/Library/Application Support/com.salon.pos/salon.toml (macOS)     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     FIFO, 10% tax, zero-cost shortfall                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # salon.toml
//! [store]
//! name = "Main Street Salon"
//!
//! [database]
//! path = "/var/lib/salon/salon.db"
//! max_connections = 5
//!
//! [settlement]
//! costing_method = "FIFO"        # FIFO | WeightedAverage
//! tax_rate_bps = 1000            # 10%
//! shortfall_policy = "zero_cost" # zero_cost | average_cost | reject
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;
use salon_core::validation::validate_tax_rate_bps;
use salon_core::{CostingMethod, SettlementConfig, ShortfallPolicy, TaxRate};

const ENV_COSTING_METHOD: &str = "SALON_COSTING_METHOD";
const ENV_TAX_RATE: &str = "SALON_TAX_RATE";
const ENV_SHORTFALL_POLICY: &str = "SALON_SHORTFALL_POLICY";
const ENV_DB_PATH: &str = "SALON_DB_PATH";
const ENV_STORE_NAME: &str = "SALON_STORE_NAME";

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_name")]
    pub name: String,
}

fn default_store_name() -> String {
    "Salon".to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: default_store_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite file. Defaults to `salon.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// How sales are costed and taxed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementSection {
    #[serde(default)]
    pub costing_method: CostingMethod,

    /// Basis points; 1000 = 10%.
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    #[serde(default)]
    pub shortfall_policy: ShortfallPolicy,
}

fn default_tax_rate_bps() -> u32 {
    TaxRate::default().bps()
}

impl Default for SettlementSection {
    fn default() -> Self {
        SettlementSection {
            costing_method: CostingMethod::default(),
            tax_rate_bps: default_tax_rate_bps(),
            shortfall_policy: ShortfallPolicy::default(),
        }
    }
}

// =============================================================================
// Store Config
// =============================================================================

/// Complete store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub settlement: SettlementSection,
}

impl StoreConfig {
    /// Loads defaults, then the TOML file, then environment overrides, and
    /// validates the result.
    ///
    /// A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`load`](Self::load) but falls back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load store config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::InvalidConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Store config saved");
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(DbError::InvalidConfig("store.name cannot be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be at least 1".into(),
            ));
        }

        validate_tax_rate_bps(self.settlement.tax_rate_bps)
            .map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        Ok(())
    }

    /// The settlement parameters for the next sale.
    pub fn settlement_config(&self) -> SettlementConfig {
        SettlementConfig {
            costing_method: self.settlement.costing_method,
            tax_rate: TaxRate::from_bps(self.settlement.tax_rate_bps),
            shortfall: self.settlement.shortfall_policy,
        }
    }

    /// Pool configuration for the configured database file.
    pub fn db_config(&self) -> DbConfig {
        let path = self
            .database
            .path
            .clone()
            .or_else(Self::default_database_path)
            .unwrap_or_else(|| PathBuf::from("salon.db"));

        DbConfig::new(path).max_connections(self.database.max_connections)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Unparseable values are logged and
    /// ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup(ENV_STORE_NAME) {
            self.store.name = name;
        }

        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(method) = lookup(ENV_COSTING_METHOD) {
            match method.parse() {
                Ok(parsed) => {
                    debug!(method = %method, "Overriding costing method from environment");
                    self.settlement.costing_method = parsed;
                }
                Err(_) => warn!(method = %method, "Unknown costing method in environment"),
            }
        }

        if let Some(rate) = lookup(ENV_TAX_RATE) {
            match rate.parse::<u32>() {
                Ok(bps) => self.settlement.tax_rate_bps = bps,
                Err(_) => warn!(rate = %rate, "Tax rate in environment is not basis points"),
            }
        }

        if let Some(policy) = lookup(ENV_SHORTFALL_POLICY) {
            match policy.parse() {
                Ok(parsed) => self.settlement.shortfall_policy = parsed,
                Err(_) => warn!(policy = %policy, "Unknown shortfall policy in environment"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "salon", "pos")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("salon.toml"))
    }

    fn default_database_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().join("salon.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());

        let settlement = config.settlement_config();
        assert_eq!(settlement.costing_method, CostingMethod::Fifo);
        assert_eq!(settlement.tax_rate.bps(), 1000);
        assert_eq!(settlement.shortfall, ShortfallPolicy::ZeroCost);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: StoreConfig = toml::from_str(
            r#"
            [settlement]
            costing_method = "WeightedAverage"
            "#,
        )
        .unwrap();

        assert_eq!(config.settlement.costing_method, CostingMethod::WeightedAverage);
        assert_eq!(config.settlement.tax_rate_bps, 1000);
        assert_eq!(config.store.name, "Salon");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides_win_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            (ENV_COSTING_METHOD, "weighted_average"),
            (ENV_TAX_RATE, "eight percent"),
            (ENV_SHORTFALL_POLICY, "reject"),
            (ENV_STORE_NAME, "Main Street"),
        ]
        .into_iter()
        .collect();

        let mut config = StoreConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.settlement.costing_method, CostingMethod::WeightedAverage);
        assert_eq!(config.settlement.tax_rate_bps, 1000);
        assert_eq!(config.settlement.shortfall_policy, ShortfallPolicy::Reject);
        assert_eq!(config.store.name, "Main Street");
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::default();
        config.settlement.tax_rate_bps = 10_001;
        assert!(config.validate().is_err());

        config.settlement.tax_rate_bps = 825;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!("salon-{}.toml", uuid::Uuid::new_v4()));
        let mut config = StoreConfig::default();
        config.store.name = "Round Trip".to_string();
        config.settlement.tax_rate_bps = 825;

        config.save(Some(path.clone())).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[settlement]"));

        let loaded: StoreConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(path).unwrap();
    }
}
