//! Catalog configuration loading from config.toml
//!
//! The catalog holds the values a fresh installation needs before it can take
//! payments: the monthly dues price, the fine causes, and the expense categories.
//! Seeding only inserts what is missing, so it is safe to run on every start.

use crate::{
    core::{expenses, fines, settings},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// Monthly dues price stored under [`settings::MONTHLY_DUES_KEY`] if not yet set
    #[serde(default)]
    pub monthly_dues: Option<f64>,
    /// Fine causes to seed
    #[serde(default)]
    pub fine_causes: Vec<FineCauseConfig>,
    /// Expense categories to seed
    #[serde(default)]
    pub expense_categories: Vec<ExpenseCategoryConfig>,
}

/// Configuration for a single fine cause
#[derive(Debug, Deserialize, Clone)]
pub struct FineCauseConfig {
    /// Description of the cause (unique)
    pub description: String,
    /// Amount charged per fine
    pub amount: f64,
}

/// Configuration for a single expense category
#[derive(Debug, Deserialize, Clone)]
pub struct ExpenseCategoryConfig {
    /// Category name (unique)
    pub name: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
}

/// Counts of rows inserted by [`seed_catalog`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    /// Whether the dues price was written
    pub dues_price_seeded: bool,
    /// Number of fine causes inserted
    pub causes_inserted: usize,
    /// Number of expense categories inserted
    pub categories_inserted: usize,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let path_ref = path.as_ref();
    debug!("Loading catalog configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads catalog configuration from `CLUB_CONFIG`, or `./config.toml` when unset.
/// A missing default file yields an empty catalog.
pub fn load_default_config() -> Result<CatalogConfig> {
    if let Ok(path) = std::env::var("CLUB_CONFIG") {
        return load_config(path);
    }
    let default_path = Path::new("config.toml");
    if default_path.exists() {
        load_config(default_path)
    } else {
        info!("No config.toml found, starting with an empty catalog.");
        Ok(CatalogConfig::default())
    }
}

/// Inserts the configured dues price, causes and categories that do not exist yet.
pub async fn seed_catalog(db: &DatabaseConnection, config: &CatalogConfig) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    if let Some(price) = config.monthly_dues {
        let existing = settings::get_setting(db, settings::MONTHLY_DUES_KEY).await?;
        if existing.is_none() {
            settings::set_setting(
                db,
                settings::MONTHLY_DUES_KEY,
                price,
                Some("Monthly dues price".to_string()),
            )
            .await?;
            summary.dues_price_seeded = true;
        }
    }

    for cause in &config.fine_causes {
        if fines::get_cause_by_description(db, &cause.description)
            .await?
            .is_none()
        {
            fines::create_cause(db, cause.description.clone(), cause.amount).await?;
            summary.causes_inserted += 1;
        }
    }

    for category in &config.expense_categories {
        if expenses::get_category_by_name(db, &category.name)
            .await?
            .is_none()
        {
            expenses::create_category(db, category.name.clone(), category.description.clone())
                .await?;
            summary.categories_inserted += 1;
        }
    }

    info!(
        "Catalog seeded: dues price {}, {} cause(s), {} categor(ies) inserted.",
        if summary.dues_price_seeded { "set" } else { "unchanged" },
        summary.causes_inserted,
        summary.categories_inserted
    );
    Ok(summary)
}
