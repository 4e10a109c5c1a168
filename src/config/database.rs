//! Database configuration module for the club treasury.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the database schema always matches the Rust structs. The one constraint the entity
//! macros cannot express, "one dues payment per player and period", is added as a
//! composite unique index.

use crate::entities::{
    Contribution, DuesPayment, Expense, ExpenseCategory, Fine, FineCause, Player, Setting,
    dues_payment,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/club_treasury.sqlite?mode=rwc";

/// Name of the unique index guarding against duplicate dues payments.
pub const DUES_PERIOD_INDEX: &str = "idx_dues_payments_player_period";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
#[instrument]
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary database tables (if missing) from the entity definitions,
/// plus the composite unique index on dues payments.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Referenced tables first
    create_table(db, &schema, Player).await?;
    create_table(db, &schema, FineCause).await?;
    create_table(db, &schema, ExpenseCategory).await?;
    create_table(db, &schema, Setting).await?;
    create_table(db, &schema, DuesPayment).await?;
    create_table(db, &schema, Contribution).await?;
    create_table(db, &schema, Fine).await?;
    create_table(db, &schema, Expense).await?;

    let dues_period_index = Index::create()
        .name(DUES_PERIOD_INDEX)
        .table(DuesPayment)
        .col(dues_payment::Column::PlayerId)
        .col(dues_payment::Column::Month)
        .col(dues_payment::Column::Year)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&dues_period_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}
