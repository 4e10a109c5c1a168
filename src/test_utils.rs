//! Shared test utilities for `ClubTreasury`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        expenses, fines,
        period::YearMonth,
        players::{self, NewPlayer},
        settings,
    },
    entities::{Position, expense_category, fine, fine_cause, player},
    errors::Result,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Installs a tracing subscriber that writes through the test harness.
/// Safe to call from several tests.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Shorthand for a calendar date. Panics on invalid input.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Shorthand for a dues period. Panics on invalid input.
pub fn ym(year: i32, month: u32) -> YearMonth {
    YearMonth::new(year, month).unwrap()
}

/// A fixed timestamp used where the exact payment moment is irrelevant.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Registration input with sensible defaults.
///
/// # Defaults
/// * `registration_alias`: "alias-{national_id}"
/// * `phone`: None
/// * `enrollment_date`: 2024-01-01
/// * `position`: field player
pub fn sample_new_player(national_id: &str, name: &str) -> NewPlayer {
    NewPlayer {
        national_id: national_id.to_string(),
        name: name.to_string(),
        registration_alias: format!("alias-{national_id}"),
        phone: None,
        enrollment_date: Some(date(2024, 1, 1)),
        position: Position::Field,
    }
}

/// Registers a field player named "Player {national_id}".
pub async fn create_test_player(
    db: &DatabaseConnection,
    national_id: &str,
    enrollment_date: NaiveDate,
) -> Result<player::Model> {
    let mut new_player = sample_new_player(national_id, &format!("Player {national_id}"));
    new_player.enrollment_date = Some(enrollment_date);
    players::register_player(db, new_player, enrollment_date).await
}

/// Registers a goalkeeper named "Player {national_id}".
pub async fn create_goalkeeper(
    db: &DatabaseConnection,
    national_id: &str,
    enrollment_date: NaiveDate,
) -> Result<player::Model> {
    let mut new_player = sample_new_player(national_id, &format!("Player {national_id}"));
    new_player.enrollment_date = Some(enrollment_date);
    new_player.position = Position::Goalkeeper;
    players::register_player(db, new_player, enrollment_date).await
}

/// Stores the monthly dues price in the settings table.
pub async fn set_dues_price(db: &DatabaseConnection, amount: f64) -> Result<()> {
    settings::set_setting(db, settings::MONTHLY_DUES_KEY, amount, None).await?;
    Ok(())
}

/// Creates a fine cause.
pub async fn create_test_cause(
    db: &DatabaseConnection,
    description: &str,
    amount: f64,
) -> Result<fine_cause::Model> {
    fines::create_cause(db, description.to_string(), amount).await
}

/// Imposes a fine dated `fined_on`, reusing the cause with `description` when it
/// already exists.
pub async fn create_test_fine(
    db: &DatabaseConnection,
    player_id: &str,
    description: &str,
    amount: f64,
    fined_on: NaiveDate,
) -> Result<fine::Model> {
    let cause = match fines::get_cause_by_description(db, description).await? {
        Some(cause) => cause,
        None => create_test_cause(db, description, amount).await?,
    };
    fines::impose_fine(db, player_id, cause.id, Some(fined_on), fined_on).await
}

/// Creates an expense category without description.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<expense_category::Model> {
    expenses::create_category(db, name.to_string(), None).await
}
