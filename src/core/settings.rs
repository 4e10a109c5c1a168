//! Stored settings - club-wide numeric configuration such as the monthly dues price.
//!
//! Payment code never reads the settings table directly. It receives a
//! [`SettingsProvider`], so the dependency on the dues price is explicit and tests
//! can pin or withhold the price without touching the database.

use crate::{
    entities::{Setting, setting},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Key under which the current monthly dues price is stored.
pub const MONTHLY_DUES_KEY: &str = "monthly_dues";

/// Source of the configuration values payment operations depend on.
#[allow(async_fn_in_trait)]
pub trait SettingsProvider {
    /// Returns the current monthly dues price, read through `db` so that it
    /// participates in the caller's transaction.
    ///
    /// # Errors
    /// Returns [`Error::MissingSetting`] when no price is configured.
    async fn monthly_dues<C: ConnectionTrait>(&self, db: &C) -> Result<f64>;
}

/// Reads configuration from the `settings` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredSettings;

impl SettingsProvider for StoredSettings {
    async fn monthly_dues<C: ConnectionTrait>(&self, db: &C) -> Result<f64> {
        monthly_dues_amount(db).await
    }
}

/// Fixed configuration values, independent of the database.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSettings {
    monthly_dues: Option<f64>,
}

impl FixedSettings {
    /// Provider that always answers with `monthly_dues`.
    #[must_use]
    pub const fn new(monthly_dues: f64) -> Self {
        Self {
            monthly_dues: Some(monthly_dues),
        }
    }

    /// Provider with no dues price configured.
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self { monthly_dues: None }
    }
}

impl SettingsProvider for FixedSettings {
    async fn monthly_dues<C: ConnectionTrait>(&self, _db: &C) -> Result<f64> {
        self.monthly_dues.ok_or_else(|| Error::MissingSetting {
            key: MONTHLY_DUES_KEY.to_string(),
        })
    }
}

/// Looks up a setting by key.
pub async fn get_setting<C>(db: &C, key: &str) -> Result<Option<setting::Model>>
where
    C: ConnectionTrait,
{
    Setting::find()
        .filter(setting::Column::Key.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all settings ordered by key.
pub async fn list_settings(db: &DatabaseConnection) -> Result<Vec<setting::Model>> {
    Setting::find()
        .order_by_asc(setting::Column::Key)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates or updates a setting. An existing description is kept when
/// `description` is `None`.
pub async fn set_setting<C>(
    db: &C,
    key: &str,
    value: f64,
    description: Option<String>,
) -> Result<setting::Model>
where
    C: ConnectionTrait,
{
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidAmount { amount: value });
    }
    if key.trim().is_empty() {
        return Err(Error::Validation {
            message: "Setting key cannot be empty".to_string(),
        });
    }

    let now = Utc::now().naive_utc();
    let existing = get_setting(db, key).await?;

    let saved = if let Some(state) = existing {
        let mut active_model: setting::ActiveModel = state.into();
        active_model.value = Set(value);
        if description.is_some() {
            active_model.description = Set(description);
        }
        active_model.updated_at = Set(now);
        active_model.update(db).await?
    } else {
        let new_setting = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            description: Set(description),
            updated_at: Set(now),
            ..Default::default()
        };
        new_setting.insert(db).await?
    };

    info!("Setting '{}' set to {}", key, value);
    Ok(saved)
}

/// Deletes a setting by key.
pub async fn delete_setting(db: &DatabaseConnection, key: &str) -> Result<()> {
    let existing = get_setting(db, key)
        .await?
        .ok_or_else(|| Error::SettingNotFound {
            key: key.to_string(),
        })?;
    existing.delete(db).await?;
    info!("Setting '{}' deleted", key);
    Ok(())
}

/// Reads the current monthly dues price from the settings table.
///
/// # Errors
/// Returns [`Error::MissingSetting`] if the price has never been configured.
pub async fn monthly_dues_amount<C>(db: &C) -> Result<f64>
where
    C: ConnectionTrait,
{
    let value = get_setting(db, MONTHLY_DUES_KEY)
        .await?
        .map(|s| s.value)
        .ok_or_else(|| Error::MissingSetting {
            key: MONTHLY_DUES_KEY.to_string(),
        })?;
    debug!("Current monthly dues price: {}", value);
    Ok(value)
}
