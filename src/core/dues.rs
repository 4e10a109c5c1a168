//! Payment ledger - monthly dues payments and other contributions.
//!
//! Dues rows are append-only and unique per player and period. The amount is
//! always taken from the [`SettingsProvider`], never from the caller.

use crate::{
    core::{period::YearMonth, players, settings::SettingsProvider},
    entities::{Contribution, DuesPayment, contribution, dues_payment},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Looks up the payment for one player and period, if any.
pub async fn get_dues_payment<C>(
    db: &C,
    player_id: &str,
    period: YearMonth,
) -> Result<Option<dues_payment::Model>>
where
    C: ConnectionTrait,
{
    DuesPayment::find()
        .filter(dues_payment::Column::PlayerId.eq(player_id))
        .filter(dues_payment::Column::Month.eq(period.month))
        .filter(dues_payment::Column::Year.eq(period.year))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Inserts one dues row at `amount`. Callers are expected to have checked for
/// an existing payment; a unique-index violation still surfaces as
/// [`Error::DuesAlreadyPaid`].
pub(crate) async fn insert_dues_payment<C>(
    db: &C,
    player_id: &str,
    period: YearMonth,
    amount: f64,
    paid_at: DateTime<Utc>,
) -> Result<dues_payment::Model>
where
    C: ConnectionTrait,
{
    let payment = dues_payment::ActiveModel {
        player_id: Set(player_id.to_string()),
        month: Set(period.month),
        year: Set(period.year),
        amount: Set(amount),
        paid_at: Set(paid_at),
        ..Default::default()
    };

    match payment.insert(db).await {
        Ok(model) => Ok(model),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(Error::DuesAlreadyPaid {
                month: period.month,
                year: period.year,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Records the monthly dues payment of one player for one period.
///
/// # Errors
/// - [`Error::PlayerNotFound`] if the player does not exist
/// - [`Error::DuesAlreadyPaid`] if the period is already paid; nothing is written
/// - [`Error::MissingSetting`] if no dues price is configured
#[instrument(skip(db, settings))]
pub async fn record_dues_payment<P>(
    db: &DatabaseConnection,
    settings: &P,
    player_id: &str,
    period: YearMonth,
    paid_at: DateTime<Utc>,
) -> Result<dues_payment::Model>
where
    P: SettingsProvider,
{
    let period = YearMonth::new(period.year, period.month)?;

    let txn = db.begin().await?;

    players::require_player(&txn, player_id).await?;

    if get_dues_payment(&txn, player_id, period).await?.is_some() {
        warn!("Rejected duplicate dues payment for {} {}", player_id, period);
        return Err(Error::DuesAlreadyPaid {
            month: period.month,
            year: period.year,
        });
    }

    let amount = settings.monthly_dues(&txn).await?;
    let payment = insert_dues_payment(&txn, player_id, period, amount, paid_at).await?;

    txn.commit().await?;

    info!(
        "Recorded dues for {} {} at {:.2}",
        player_id, period, payment.amount
    );
    Ok(payment)
}

/// All dues payments of a player, oldest period first.
pub async fn get_dues_for_player<C>(db: &C, player_id: &str) -> Result<Vec<dues_payment::Model>>
where
    C: ConnectionTrait,
{
    DuesPayment::find()
        .filter(dues_payment::Column::PlayerId.eq(player_id))
        .order_by_asc(dues_payment::Column::Year)
        .order_by_asc(dues_payment::Column::Month)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of dues rows recorded for a player.
pub async fn count_dues_for_player<C>(db: &C, player_id: &str) -> Result<u64>
where
    C: ConnectionTrait,
{
    DuesPayment::find()
        .filter(dues_payment::Column::PlayerId.eq(player_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Records an ad-hoc contribution (raffle money, donation) from a player.
#[instrument(skip(db))]
pub async fn record_contribution(
    db: &DatabaseConnection,
    player_id: &str,
    concept: &str,
    amount: f64,
    contributed_at: DateTime<Utc>,
) -> Result<contribution::Model> {
    if concept.trim().is_empty() {
        return Err(Error::Validation {
            message: "Contribution concept cannot be empty".to_string(),
        });
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    players::require_player(db, player_id).await?;

    let contribution = contribution::ActiveModel {
        player_id: Set(player_id.to_string()),
        concept: Set(concept.trim().to_string()),
        amount: Set(amount),
        contributed_at: Set(contributed_at),
        ..Default::default()
    };
    let result = contribution.insert(db).await?;
    info!(
        "Recorded contribution '{}' of {:.2} from {}",
        result.concept, result.amount, player_id
    );
    Ok(result)
}

/// All contributions of a player, newest first.
pub async fn get_contributions_for_player<C>(
    db: &C,
    player_id: &str,
) -> Result<Vec<contribution::Model>>
where
    C: ConnectionTrait,
{
    Contribution::find()
        .filter(contribution::Column::PlayerId.eq(player_id))
        .order_by_desc(contribution::Column::ContributedAt)
        .all(db)
        .await
        .map_err(Into::into)
}
