//! Fine ledger - fine causes, imposing fines, and flipping their payment state.
//!
//! A fine copies its cause's amount when it is created. `paid_at` is set if and
//! only if the fine is paid. Every change to a player's fines recomputes the
//! player's cached `account_settled` flag inside the same database transaction.

use crate::{
    core::players,
    entities::{Fine, FineCause, fine, fine_cause},
    errors::{Error, Result},
};
use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

const MIN_CAUSE_DESCRIPTION_LEN: usize = 3;
const MAX_CAUSE_DESCRIPTION_LEN: usize = 200;

/// Fields of a fine cause that may be edited. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CausePatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
}

/// Group-contribution tags stamped on a fine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupTag<'a> {
    pub(crate) group_id: &'a str,
    pub(crate) concept: &'a str,
}

fn validate_cause_description(description: &str) -> Result<String> {
    let trimmed = description.trim();
    let len = trimmed.chars().count();
    if !(MIN_CAUSE_DESCRIPTION_LEN..=MAX_CAUSE_DESCRIPTION_LEN).contains(&len) {
        return Err(Error::Validation {
            message: format!(
                "Description must be between {MIN_CAUSE_DESCRIPTION_LEN} and {MAX_CAUSE_DESCRIPTION_LEN} characters"
            ),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_positive_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Checks a fine (or group contribution) date against `today`: at most one day
/// ahead and at most one year back.
///
/// # Errors
/// Returns [`Error::InvalidDate`] when the date falls outside that range.
pub fn validate_fine_date(fined_on: NaiveDate, today: NaiveDate) -> Result<()> {
    let latest = today.checked_add_days(Days::new(1)).unwrap_or(today);
    if fined_on > latest {
        return Err(Error::InvalidDate {
            message: format!("{fined_on} is more than one day in the future (latest {latest})"),
        });
    }
    let earliest = today.checked_sub_months(Months::new(12)).unwrap_or(today);
    if fined_on < earliest {
        return Err(Error::InvalidDate {
            message: format!("{fined_on} is more than one year in the past (earliest {earliest})"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Causes
// ---------------------------------------------------------------------------

/// Finds a cause by ID.
pub async fn get_cause<C>(db: &C, cause_id: i64) -> Result<Option<fine_cause::Model>>
where
    C: ConnectionTrait,
{
    FineCause::find_by_id(cause_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a cause by ID, failing with [`Error::FineCauseNotFound`].
pub async fn require_cause<C>(db: &C, cause_id: i64) -> Result<fine_cause::Model>
where
    C: ConnectionTrait,
{
    get_cause(db, cause_id)
        .await?
        .ok_or(Error::FineCauseNotFound { cause_id })
}

/// Finds a cause by its exact description.
pub async fn get_cause_by_description<C>(
    db: &C,
    description: &str,
) -> Result<Option<fine_cause::Model>>
where
    C: ConnectionTrait,
{
    FineCause::find()
        .filter(fine_cause::Column::Description.eq(description.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all causes ordered by description.
pub async fn list_causes(db: &DatabaseConnection) -> Result<Vec<fine_cause::Model>> {
    FineCause::find()
        .order_by_asc(fine_cause::Column::Description)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a cause to the catalog.
///
/// # Errors
/// - [`Error::Validation`] for a description shorter than 3 or longer than 200 characters
/// - [`Error::InvalidAmount`] for non-positive or non-finite amounts
/// - [`Error::DuplicateName`] if the description already exists
pub async fn create_cause(
    db: &DatabaseConnection,
    description: String,
    amount: f64,
) -> Result<fine_cause::Model> {
    let description = validate_cause_description(&description)?;
    validate_positive_amount(amount)?;

    if get_cause_by_description(db, &description).await?.is_some() {
        return Err(Error::DuplicateName {
            entity: "fine cause",
            name: description,
        });
    }

    let cause = fine_cause::ActiveModel {
        description: Set(description),
        amount: Set(amount),
        ..Default::default()
    };
    let result = cause.insert(db).await?;
    info!("Created fine cause '{}' ({:.2})", result.description, result.amount);
    Ok(result)
}

/// Edits a cause. Fines already imposed keep the amount they were created with.
pub async fn update_cause(
    db: &DatabaseConnection,
    cause_id: i64,
    patch: CausePatch,
) -> Result<fine_cause::Model> {
    let existing = require_cause(db, cause_id).await?;
    let mut active_model: fine_cause::ActiveModel = existing.into();

    if let Some(description) = patch.description {
        let description = validate_cause_description(&description)?;
        if let Some(other) = get_cause_by_description(db, &description).await? {
            if other.id != cause_id {
                return Err(Error::DuplicateName {
                    entity: "fine cause",
                    name: description,
                });
            }
        }
        active_model.description = Set(description);
    }
    if let Some(amount) = patch.amount {
        validate_positive_amount(amount)?;
        active_model.amount = Set(amount);
    }

    let updated = active_model.update(db).await?;
    info!("Updated fine cause {}", updated.id);
    Ok(updated)
}

/// Removes a cause that no fine references.
///
/// # Errors
/// Returns [`Error::InUse`] while fines reference the cause.
pub async fn delete_cause(db: &DatabaseConnection, cause_id: i64) -> Result<()> {
    let cause = require_cause(db, cause_id).await?;
    let references = Fine::find()
        .filter(fine::Column::CauseId.eq(cause_id))
        .count(db)
        .await?;
    if references > 0 {
        return Err(Error::InUse {
            entity: "fine cause",
            name: cause.description,
            references,
        });
    }
    let description = cause.description.clone();
    cause.delete(db).await?;
    info!("Deleted fine cause '{}'", description);
    Ok(())
}

// ---------------------------------------------------------------------------
// Fines
// ---------------------------------------------------------------------------

/// Inserts an unpaid fine for `player_id`, copying the cause amount.
pub(crate) async fn insert_fine<C>(
    db: &C,
    player_id: &str,
    cause: &fine_cause::Model,
    fined_on: NaiveDate,
    group: Option<GroupTag<'_>>,
) -> Result<fine::Model>
where
    C: ConnectionTrait,
{
    let fine = fine::ActiveModel {
        player_id: Set(player_id.to_string()),
        cause_id: Set(cause.id),
        amount: Set(cause.amount),
        fined_on: Set(fined_on),
        is_paid: Set(false),
        paid_at: Set(None),
        is_group_contribution: Set(group.is_some()),
        group_id: Set(group.map(|g| g.group_id.to_string())),
        group_concept: Set(group.map(|g| g.concept.to_string())),
        ..Default::default()
    };
    fine.insert(db).await.map_err(Into::into)
}

/// Imposes a fine on a player. The fine date defaults to `today`.
///
/// # Errors
/// - [`Error::PlayerNotFound`] / [`Error::FineCauseNotFound`] for unknown references
/// - [`Error::InvalidDate`] for dates more than a day ahead or a year back
#[instrument(skip(db))]
pub async fn impose_fine(
    db: &DatabaseConnection,
    player_id: &str,
    cause_id: i64,
    fined_on: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<fine::Model> {
    let fined_on = fined_on.unwrap_or(today);
    validate_fine_date(fined_on, today)?;

    let txn = db.begin().await?;

    players::require_player(&txn, player_id).await?;
    let cause = require_cause(&txn, cause_id).await?;

    let fine = insert_fine(&txn, player_id, &cause, fined_on, None).await?;
    players::refresh_account_settled(&txn, player_id).await?;

    txn.commit().await?;

    info!(
        "Imposed fine {} on {} for '{}' ({:.2})",
        fine.id, player_id, cause.description, fine.amount
    );
    Ok(fine)
}

/// Finds a fine by ID.
pub async fn get_fine<C>(db: &C, fine_id: i64) -> Result<Option<fine::Model>>
where
    C: ConnectionTrait,
{
    Fine::find_by_id(fine_id).one(db).await.map_err(Into::into)
}

/// Lists a player's fines, newest first, optionally including paid ones.
pub async fn get_fines_for_player<C>(
    db: &C,
    player_id: &str,
    include_paid: bool,
) -> Result<Vec<fine::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Fine::find().filter(fine::Column::PlayerId.eq(player_id));
    if !include_paid {
        query = query.filter(fine::Column::IsPaid.eq(false));
    }
    query
        .order_by_desc(fine::Column::FinedOn)
        .order_by_desc(fine::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists a player's unpaid fines.
pub async fn get_unpaid_fines_for_player<C>(db: &C, player_id: &str) -> Result<Vec<fine::Model>>
where
    C: ConnectionTrait,
{
    get_fines_for_player(db, player_id, false).await
}

/// Lists every fine in the club, newest first, optionally including paid ones.
pub async fn list_fines(db: &DatabaseConnection, include_paid: bool) -> Result<Vec<fine::Model>> {
    let mut query = Fine::find();
    if !include_paid {
        query = query.filter(fine::Column::IsPaid.eq(false));
    }
    query
        .order_by_desc(fine::Column::FinedOn)
        .order_by_desc(fine::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks a fine paid (stamping `now`) or unpaid (clearing the timestamp).
///
/// Setting a fine to the state it is already in is a no-op.
///
/// # Errors
/// - [`Error::FineNotFound`] for unknown fines
/// - [`Error::InvalidDate`] when paying before the fine date, or when un-paying a
///   fine that was paid on an earlier day than `now`
#[instrument(skip(db))]
pub async fn set_fine_paid(
    db: &DatabaseConnection,
    fine_id: i64,
    paid: bool,
    now: DateTime<Utc>,
) -> Result<fine::Model> {
    let txn = db.begin().await?;

    let existing = get_fine(&txn, fine_id)
        .await?
        .ok_or(Error::FineNotFound { fine_id })?;

    if existing.is_paid == paid {
        debug!("Fine {} already has paid = {}", fine_id, paid);
        return Ok(existing);
    }

    let player_id = existing.player_id.clone();
    let mut active_model: fine::ActiveModel = existing.clone().into();

    if paid {
        if now.date_naive() < existing.fined_on {
            return Err(Error::InvalidDate {
                message: format!(
                    "payment date {} precedes fine date {}",
                    now.date_naive(),
                    existing.fined_on
                ),
            });
        }
        active_model.is_paid = Set(true);
        active_model.paid_at = Set(Some(now));
    } else {
        if let Some(paid_at) = existing.paid_at {
            if paid_at.date_naive() < now.date_naive() {
                warn!(
                    "Refused to un-pay fine {} paid on {}",
                    fine_id,
                    paid_at.date_naive()
                );
                return Err(Error::InvalidDate {
                    message: format!(
                        "fine {fine_id} was paid on {}, only same-day payments can be reverted",
                        paid_at.date_naive()
                    ),
                });
            }
        }
        active_model.is_paid = Set(false);
        active_model.paid_at = Set(None);
    }

    let updated = active_model.update(&txn).await?;
    players::refresh_account_settled(&txn, &player_id).await?;

    txn.commit().await?;

    info!(
        "Fine {} marked as {}",
        fine_id,
        if paid { "paid" } else { "unpaid" }
    );
    Ok(updated)
}

/// Removes a fine (explicit admin action) and recomputes the player's flag.
#[instrument(skip(db))]
pub async fn delete_fine(db: &DatabaseConnection, fine_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = get_fine(&txn, fine_id)
        .await?
        .ok_or(Error::FineNotFound { fine_id })?;
    let player_id = existing.player_id.clone();

    existing.delete(&txn).await?;
    players::refresh_account_settled(&txn, &player_id).await?;

    txn.commit().await?;
    info!("Deleted fine {} of player {}", fine_id, player_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_fine_date_range() {
        let today = date(2024, 6, 15);
        assert!(validate_fine_date(today, today).is_ok());
        assert!(validate_fine_date(date(2024, 6, 16), today).is_ok());
        assert!(validate_fine_date(date(2023, 6, 15), today).is_ok());

        assert!(matches!(
            validate_fine_date(date(2024, 6, 17), today),
            Err(Error::InvalidDate { .. })
        ));
        assert!(matches!(
            validate_fine_date(date(2023, 6, 14), today),
            Err(Error::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_validate_fine_date_leap_day() {
        // One year before Feb 29 clamps to Feb 28
        let today = date(2024, 2, 29);
        assert!(validate_fine_date(date(2023, 2, 28), today).is_ok());
        assert!(validate_fine_date(date(2023, 2, 27), today).is_err());
    }

    #[tokio::test]
    async fn test_create_cause_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let short = create_cause(&db, "ab".to_string(), 1000.0).await;
        assert!(matches!(short, Err(Error::Validation { .. })));

        let zero = create_cause(&db, "Late arrival".to_string(), 0.0).await;
        assert!(matches!(zero, Err(Error::InvalidAmount { .. })));

        create_cause(&db, "Late arrival".to_string(), 1000.0).await?;
        let duplicate = create_cause(&db, " Late arrival ".to_string(), 2000.0).await;
        assert!(matches!(duplicate, Err(Error::DuplicateName { .. })));

        assert_eq!(list_causes(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fine_amount_is_snapshot_of_cause() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let cause = create_test_cause(&db, "Yellow card", 10000.0).await?;

        let fine = impose_fine(&db, "1001", cause.id, None, date(2024, 3, 1)).await?;
        assert_eq!(fine.amount, 10000.0);

        update_cause(
            &db,
            cause.id,
            CausePatch {
                amount: Some(25000.0),
                ..Default::default()
            },
        )
        .await?;

        let reloaded = get_fine(&db, fine.id).await?.unwrap();
        assert_eq!(reloaded.amount, 10000.0);

        let later = impose_fine(&db, "1001", cause.id, None, date(2024, 3, 2)).await?;
        assert_eq!(later.amount, 25000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_impose_fine_clears_settled_flag() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let cause = create_test_cause(&db, "Yellow card", 10000.0).await?;

        let fine = impose_fine(&db, "1001", cause.id, None, date(2024, 3, 1)).await?;
        assert!(!fine.is_paid);
        assert!(fine.paid_at.is_none());
        assert_eq!(fine.fined_on, date(2024, 3, 1));

        let player = players::require_player(&db, "1001").await?;
        assert!(!player.account_settled);
        Ok(())
    }

    #[tokio::test]
    async fn test_impose_fine_rejects_unknown_references_and_dates() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let cause = create_test_cause(&db, "Yellow card", 10000.0).await?;
        let today = date(2024, 3, 1);

        let no_player = impose_fine(&db, "nope", cause.id, None, today).await;
        assert!(matches!(no_player, Err(Error::PlayerNotFound { .. })));

        let no_cause = impose_fine(&db, "1001", 999, None, today).await;
        assert!(matches!(
            no_cause,
            Err(Error::FineCauseNotFound { cause_id: 999 })
        ));

        let future = impose_fine(&db, "1001", cause.id, Some(date(2024, 3, 5)), today).await;
        assert!(matches!(future, Err(Error::InvalidDate { .. })));

        assert!(get_fines_for_player(&db, "1001", true).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_set_fine_paid_round_trip_same_day() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let cause = create_test_cause(&db, "Yellow card", 10000.0).await?;
        let fine = impose_fine(&db, "1001", cause.id, None, date(2024, 3, 1)).await?;

        let morning = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let paid = set_fine_paid(&db, fine.id, true, morning).await?;
        assert!(paid.is_paid);
        assert_eq!(paid.paid_at, Some(morning));
        assert!(players::require_player(&db, "1001").await?.account_settled);

        let evening = Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap();
        let unpaid = set_fine_paid(&db, fine.id, false, evening).await?;
        assert!(!unpaid.is_paid);
        assert!(unpaid.paid_at.is_none());
        assert!(!players::require_player(&db, "1001").await?.account_settled);
        Ok(())
    }

    #[tokio::test]
    async fn test_cannot_unpay_fine_paid_on_previous_day() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let cause = create_test_cause(&db, "Yellow card", 10000.0).await?;
        let fine = impose_fine(&db, "1001", cause.id, None, date(2024, 3, 1)).await?;

        let paid_at = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        set_fine_paid(&db, fine.id, true, paid_at).await?;

        let next_day = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let result = set_fine_paid(&db, fine.id, false, next_day).await;
        assert!(matches!(result, Err(Error::InvalidDate { .. })));

        let reloaded = get_fine(&db, fine.id).await?.unwrap();
        assert!(reloaded.is_paid);
        assert_eq!(reloaded.paid_at, Some(paid_at));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_fine_paid_missing_fine() -> Result<()> {
        let db = setup_test_db().await?;

        let result = set_fine_paid(&db, 42, true, now()).await;
        assert!(matches!(result, Err(Error::FineNotFound { fine_id: 42 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_fine_restores_settled_flag() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let cause = create_test_cause(&db, "Yellow card", 10000.0).await?;
        let fine = impose_fine(&db, "1001", cause.id, None, date(2024, 3, 1)).await?;

        delete_fine(&db, fine.id).await?;
        assert!(get_fine(&db, fine.id).await?.is_none());
        assert!(players::require_player(&db, "1001").await?.account_settled);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cause_in_use() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let used = create_test_cause(&db, "Yellow card", 10000.0).await?;
        let unused = create_test_cause(&db, "Red card", 20000.0).await?;
        impose_fine(&db, "1001", used.id, None, date(2024, 3, 1)).await?;

        let result = delete_cause(&db, used.id).await;
        assert!(matches!(result, Err(Error::InUse { references: 1, .. })));

        delete_cause(&db, unused.id).await?;
        assert_eq!(list_causes(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_fines_for_player_filters_paid() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let cause = create_test_cause(&db, "Yellow card", 10000.0).await?;
        let first = impose_fine(&db, "1001", cause.id, None, date(2024, 3, 1)).await?;
        impose_fine(&db, "1001", cause.id, None, date(2024, 3, 2)).await?;

        let paid_at = Utc.with_ymd_and_hms(2024, 3, 3, 9, 0, 0).unwrap();
        set_fine_paid(&db, first.id, true, paid_at).await?;

        assert_eq!(get_fines_for_player(&db, "1001", true).await?.len(), 2);
        assert_eq!(get_unpaid_fines_for_player(&db, "1001").await?.len(), 1);
        assert_eq!(list_fines(&db, false).await?.len(), 1);
        Ok(())
    }
}
