//! Account status evaluation.
//!
//! A player is up to date when they have no unpaid fines and, unless they are a
//! goalkeeper, every month from their enrollment month through the current month
//! has a recorded dues payment. [`evaluate_status`] is a pure function over the
//! player and their two ledgers; the `get_`/`list_` wrappers load those ledgers.
//!
//! Labels follow a fixed precedence:
//! 1. up to date
//! 2. goalkeeper with pending fines
//! 3. owes dues and has pending fines
//! 4. has pending fines
//! 5. owes dues

use crate::{
    core::{
        period::{YearMonth, months_between},
        players,
    },
    entities::{DuesPayment, Fine, Position, dues_payment, fine, player},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::prelude::*;
use serde::Serialize;
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};
use tracing::debug;

/// Display label for an account status. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusLabel {
    /// No unpaid fines and no missing dues
    UpToDate,
    /// Goalkeeper (dues-exempt) with unpaid fines
    GoalkeeperWithPendingFines,
    /// Missing dues and unpaid fines
    OwesDuesAndFines,
    /// Unpaid fines only
    PendingFines,
    /// Missing dues only
    OwesDues,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UpToDate => "UP TO DATE",
            Self::GoalkeeperWithPendingFines => "GOALKEEPER WITH PENDING FINES",
            Self::OwesDuesAndFines => "OWES DUES AND HAS PENDING FINES",
            Self::PendingFines => "HAS PENDING FINES",
            Self::OwesDues => "OWES DUES",
        };
        f.write_str(label)
    }
}

/// Structured account status of one player.
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatus {
    /// Player's national ID
    pub national_id: String,
    /// Player's display name
    pub name: String,
    /// Player's position
    pub position: Position,
    /// No unpaid fines and, unless exempt, no missing dues
    pub is_up_to_date: bool,
    /// Display label
    pub label: StatusLabel,
    /// Number of unpaid fines
    pub pending_fines: usize,
    /// Sum of unpaid fines
    pub pending_fines_amount: f64,
    /// Obligation months without a payment, oldest first
    pub pending_months: Vec<YearMonth>,
    /// Number of obligation months; `None` for players exempt from dues
    pub months_owed: Option<usize>,
    /// Obligation months covered by a payment; `None` for players exempt from dues
    pub months_paid: Option<usize>,
    /// Sum of every dues payment on record
    pub dues_paid_total: f64,
}

/// The months a player owes dues for: enrollment month through `current`,
/// both inclusive.
#[must_use]
pub fn obligation_months(enrollment_date: NaiveDate, current: YearMonth) -> Vec<YearMonth> {
    months_between(YearMonth::from_date(enrollment_date), current)
}

/// Picks the display label for a combination of outcomes.
#[must_use]
pub const fn derive_label(position: Position, has_pending_fines: bool, owes_dues: bool) -> StatusLabel {
    if !has_pending_fines && !owes_dues {
        StatusLabel::UpToDate
    } else if has_pending_fines && !position.owes_monthly_dues() {
        StatusLabel::GoalkeeperWithPendingFines
    } else if has_pending_fines && owes_dues {
        StatusLabel::OwesDuesAndFines
    } else if has_pending_fines {
        StatusLabel::PendingFines
    } else {
        StatusLabel::OwesDues
    }
}

/// Evaluates a player's account against their fines and dues payments.
///
/// `fines` may include paid fines; only unpaid ones count. `current` is the month
/// the evaluation is made in.
#[must_use]
pub fn evaluate_status(
    player: &player::Model,
    fines: &[fine::Model],
    payments: &[dues_payment::Model],
    current: YearMonth,
) -> AccountStatus {
    let unpaid: Vec<&fine::Model> = fines.iter().filter(|f| !f.is_paid).collect();
    let pending_fines_amount = unpaid.iter().map(|f| f.amount).sum();
    let dues_paid_total = payments.iter().map(|p| p.amount).sum();

    let (pending_months, months_owed, months_paid) = if player.position.owes_monthly_dues() {
        let paid: BTreeSet<YearMonth> = payments
            .iter()
            .map(|p| YearMonth {
                year: p.year,
                month: p.month,
            })
            .collect();
        let obligations = obligation_months(player.enrollment_date, current);
        let owed = obligations.len();
        let pending: Vec<YearMonth> = obligations
            .into_iter()
            .filter(|period| !paid.contains(period))
            .collect();
        let covered = owed - pending.len();
        (pending, Some(owed), Some(covered))
    } else {
        (Vec::new(), None, None)
    };

    let has_pending_fines = !unpaid.is_empty();
    let owes_dues = !pending_months.is_empty();

    AccountStatus {
        national_id: player.national_id.clone(),
        name: player.name.clone(),
        position: player.position,
        is_up_to_date: !has_pending_fines && !owes_dues,
        label: derive_label(player.position, has_pending_fines, owes_dues),
        pending_fines: unpaid.len(),
        pending_fines_amount,
        pending_months,
        months_owed,
        months_paid,
        dues_paid_total,
    }
}

/// Loads and evaluates one player's account as of `today`.
///
/// # Errors
/// Returns [`crate::errors::Error::PlayerNotFound`] for unknown players.
pub async fn get_player_status<C>(db: &C, national_id: &str, today: NaiveDate) -> Result<AccountStatus>
where
    C: ConnectionTrait,
{
    let player = players::require_player(db, national_id).await?;
    let fines = Fine::find()
        .filter(fine::Column::PlayerId.eq(national_id))
        .filter(fine::Column::IsPaid.eq(false))
        .all(db)
        .await?;
    let payments = DuesPayment::find()
        .filter(dues_payment::Column::PlayerId.eq(national_id))
        .all(db)
        .await?;

    let status = evaluate_status(&player, &fines, &payments, YearMonth::from_date(today));
    debug!("Status of {}: {}", national_id, status.label);
    Ok(status)
}

/// Evaluates every player (or only active ones) as of `today`, ordered by name.
pub async fn list_player_statuses<C>(
    db: &C,
    active_only: bool,
    today: NaiveDate,
) -> Result<Vec<AccountStatus>>
where
    C: ConnectionTrait,
{
    let roster = players::list_players(db, active_only).await?;

    let mut fines_by_player: HashMap<String, Vec<fine::Model>> = HashMap::new();
    for fine in Fine::find()
        .filter(fine::Column::IsPaid.eq(false))
        .all(db)
        .await?
    {
        fines_by_player
            .entry(fine.player_id.clone())
            .or_default()
            .push(fine);
    }

    let mut payments_by_player: HashMap<String, Vec<dues_payment::Model>> = HashMap::new();
    for payment in DuesPayment::find().all(db).await? {
        payments_by_player
            .entry(payment.player_id.clone())
            .or_default()
            .push(payment);
    }

    let current = YearMonth::from_date(today);
    Ok(roster
        .iter()
        .map(|player| {
            let fines = fines_by_player
                .get(&player.national_id)
                .map_or(&[][..], Vec::as_slice);
            let payments = payments_by_player
                .get(&player.national_id)
                .map_or(&[][..], Vec::as_slice);
            evaluate_status(player, fines, payments, current)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::{dues, fines, settings::FixedSettings},
        test_utils::*,
    };
    use chrono::{TimeZone, Utc};

    fn player(position: Position, enrollment_date: NaiveDate) -> player::Model {
        player::Model {
            national_id: "1001".to_string(),
            name: "Test Player".to_string(),
            registration_alias: "tester".to_string(),
            phone: None,
            enrollment_date,
            position,
            account_settled: true,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn unpaid_fine(id: i64, amount: f64) -> fine::Model {
        fine::Model {
            id,
            player_id: "1001".to_string(),
            cause_id: 1,
            amount,
            fined_on: date(2024, 1, 10),
            is_paid: false,
            paid_at: None,
            is_group_contribution: false,
            group_id: None,
            group_concept: None,
        }
    }

    fn payment(year: i32, month: u32) -> dues_payment::Model {
        dues_payment::Model {
            id: i64::from(month) + i64::from(year) * 100,
            player_id: "1001".to_string(),
            month,
            year,
            amount: 20000.0,
            paid_at: Utc.with_ymd_and_hms(year, month, 5, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_goalkeeper_without_fines_is_up_to_date() {
        let keeper = player(Position::Goalkeeper, date(2019, 3, 1));

        let status = evaluate_status(&keeper, &[], &[], ym(2024, 6));
        assert!(status.is_up_to_date);
        assert_eq!(status.label, StatusLabel::UpToDate);
        assert!(status.pending_months.is_empty());
        assert_eq!(status.months_owed, None);
        assert_eq!(status.months_paid, None);
    }

    #[test]
    fn test_goalkeeper_with_fines_label() {
        let keeper = player(Position::Goalkeeper, date(2019, 3, 1));

        let status = evaluate_status(&keeper, &[unpaid_fine(1, 5000.0)], &[], ym(2024, 6));
        assert!(!status.is_up_to_date);
        assert_eq!(status.label, StatusLabel::GoalkeeperWithPendingFines);
        assert_eq!(status.pending_fines, 1);
        assert_eq!(status.pending_fines_amount, 5000.0);
    }

    #[test]
    fn test_enrolled_this_month_owes_exactly_one_month() {
        let months = obligation_months(date(2024, 5, 28), ym(2024, 5));
        assert_eq!(months, vec![ym(2024, 5)]);

        let rookie = player(Position::Field, date(2024, 5, 28));
        let status = evaluate_status(&rookie, &[], &[], ym(2024, 5));
        assert_eq!(status.months_owed, Some(1));
        assert_eq!(status.label, StatusLabel::OwesDues);

        let status = evaluate_status(&rookie, &[], &[payment(2024, 5)], ym(2024, 5));
        assert!(status.is_up_to_date);
    }

    #[test]
    fn test_enrolled_across_year_boundary_without_payments() {
        let field_player = player(Position::Field, date(2023, 11, 15));

        let status = evaluate_status(&field_player, &[], &[], ym(2024, 2));
        assert_eq!(
            status.pending_months,
            vec![ym(2023, 11), ym(2023, 12), ym(2024, 1), ym(2024, 2)]
        );
        assert_eq!(status.months_owed, Some(4));
        assert_eq!(status.months_paid, Some(0));
        assert!(!status.is_up_to_date);
    }

    #[test]
    fn test_partial_payments_leave_gaps() {
        let field_player = player(Position::Field, date(2023, 11, 15));
        let payments = [payment(2023, 11), payment(2024, 1)];

        let status = evaluate_status(&field_player, &[], &payments, ym(2024, 2));
        assert_eq!(status.pending_months, vec![ym(2023, 12), ym(2024, 2)]);
        assert_eq!(status.months_paid, Some(2));
        assert_eq!(status.dues_paid_total, 40000.0);
    }

    #[test]
    fn test_unpaid_fine_blocks_up_to_date() {
        let field_player = player(Position::Field, date(2024, 1, 1));
        let payments = [payment(2024, 1), payment(2024, 2)];

        let status = evaluate_status(&field_player, &[unpaid_fine(1, 3000.0)], &payments, ym(2024, 2));
        assert!(!status.is_up_to_date);
        assert_eq!(status.label, StatusLabel::PendingFines);
    }

    #[test]
    fn test_paid_fines_are_ignored() {
        let field_player = player(Position::Field, date(2024, 1, 1));
        let mut settled = unpaid_fine(1, 3000.0);
        settled.is_paid = true;
        settled.paid_at = Some(Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap());

        let status = evaluate_status(&field_player, &[settled], &[payment(2024, 1)], ym(2024, 1));
        assert!(status.is_up_to_date);
        assert_eq!(status.pending_fines, 0);
    }

    #[test]
    fn test_label_precedence() {
        assert_eq!(
            derive_label(Position::Field, false, false),
            StatusLabel::UpToDate
        );
        assert_eq!(
            derive_label(Position::Goalkeeper, true, false),
            StatusLabel::GoalkeeperWithPendingFines
        );
        assert_eq!(
            derive_label(Position::Field, true, true),
            StatusLabel::OwesDuesAndFines
        );
        assert_eq!(
            derive_label(Position::Field, true, false),
            StatusLabel::PendingFines
        );
        assert_eq!(
            derive_label(Position::Field, false, true),
            StatusLabel::OwesDues
        );
        assert_eq!(StatusLabel::UpToDate.to_string(), "UP TO DATE");
    }

    #[tokio::test]
    async fn test_get_player_status_from_ledgers() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 10)).await?;
        let settings = FixedSettings::new(20000.0);

        dues::record_dues_payment(&db, &settings, "1001", ym(2024, 1), now()).await?;
        dues::record_dues_payment(&db, &settings, "1001", ym(2024, 2), now()).await?;

        let status = get_player_status(&db, "1001", date(2024, 2, 20)).await?;
        assert!(status.is_up_to_date);

        let cause = create_test_cause(&db, "Late arrival", 2000.0).await?;
        fines::impose_fine(&db, "1001", cause.id, None, date(2024, 2, 20)).await?;

        let status = get_player_status(&db, "1001", date(2024, 2, 20)).await?;
        assert!(!status.is_up_to_date);
        assert_eq!(status.pending_fines_amount, 2000.0);

        let status = get_player_status(&db, "1001", date(2024, 3, 1)).await?;
        assert_eq!(status.label, StatusLabel::OwesDuesAndFines);
        assert_eq!(status.pending_months, vec![ym(2024, 3)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_player_statuses() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 3, 1)).await?;
        create_goalkeeper(&db, "1002", date(2020, 1, 1)).await?;
        create_test_player(&db, "1003", date(2024, 3, 1)).await?;
        players::set_player_active(&db, "1003", false).await?;

        let statuses = list_player_statuses(&db, true, date(2024, 3, 15)).await?;
        assert_eq!(statuses.len(), 2);

        let keeper = statuses.iter().find(|s| s.national_id == "1002").unwrap();
        assert!(keeper.is_up_to_date);

        let field = statuses.iter().find(|s| s.national_id == "1001").unwrap();
        assert_eq!(field.label, StatusLabel::OwesDues);

        assert_eq!(list_player_statuses(&db, false, date(2024, 3, 15)).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_player_status_missing_player() -> Result<()> {
        let db = setup_test_db().await?;
        let result = get_player_status(&db, "ghost", date(2024, 3, 15)).await;
        assert!(matches!(
            result,
            Err(crate::errors::Error::PlayerNotFound { .. })
        ));
        Ok(())
    }
}
