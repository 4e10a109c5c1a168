//! Combined payments - settle several dues periods and fines of one player at once.
//!
//! Every check runs before the first write, and all writes share one
//! transaction. A rejected request leaves both ledgers exactly as they were.

use crate::{
    core::{
        dues, fines,
        period::YearMonth,
        players,
        settings::SettingsProvider,
    },
    entities::{dues_payment, fine},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// One operator request: dues periods and fines to settle for a player.
#[derive(Debug, Clone, Default)]
pub struct CombinedPayment {
    /// Player paying
    pub national_id: String,
    /// Dues periods to record
    pub periods: Vec<YearMonth>,
    /// Unpaid fines of the player to settle
    pub fine_ids: Vec<i64>,
    /// Payment timestamp shared by every row; defaults to the call's `now`
    pub paid_at: Option<DateTime<Utc>>,
}

/// What a combined payment wrote.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    /// Player who paid
    pub national_id: String,
    /// Timestamp stamped on every row
    pub paid_at: DateTime<Utc>,
    /// Dues rows inserted, oldest period first
    pub dues: Vec<dues_payment::Model>,
    /// Fines marked paid
    pub fines: Vec<fine::Model>,
    /// Sum of the dues rows
    pub dues_total: f64,
    /// Sum of the fines paid
    pub fines_total: f64,
    /// Whether the player has no unpaid fines left
    pub account_settled: bool,
}

impl PaymentReceipt {
    /// Total amount collected by this payment.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.dues_total + self.fines_total
    }
}

fn validate_request(payment: &CombinedPayment) -> Result<Vec<YearMonth>> {
    if payment.periods.is_empty() && payment.fine_ids.is_empty() {
        return Err(Error::Validation {
            message: "A payment must include at least one dues period or fine".to_string(),
        });
    }

    let mut seen_periods = HashSet::new();
    let mut periods = Vec::with_capacity(payment.periods.len());
    for period in &payment.periods {
        let period = YearMonth::new(period.year, period.month)?;
        if !seen_periods.insert(period) {
            return Err(Error::Validation {
                message: format!("Period {period} is listed more than once"),
            });
        }
        periods.push(period);
    }

    let mut seen_fines = HashSet::new();
    for fine_id in &payment.fine_ids {
        if !seen_fines.insert(*fine_id) {
            return Err(Error::Validation {
                message: format!("Fine {fine_id} is listed more than once"),
            });
        }
    }

    periods.sort();
    Ok(periods)
}

/// Settles dues periods and fines for one player in a single transaction.
///
/// Dues rows take their amount from `settings`. Fines are stamped paid with the
/// shared payment timestamp, and the player's settled flag is recomputed.
///
/// # Errors
/// - [`Error::Validation`] for empty requests or repeated periods/fines
/// - [`Error::InvalidPeriod`] for malformed periods
/// - [`Error::PlayerNotFound`] / [`Error::FineNotFound`] for unknown references
/// - [`Error::DuesAlreadyPaid`] if any period already has a payment
/// - [`Error::FineNotPayable`] if a fine belongs to another player or is already paid
/// - [`Error::InvalidDate`] if the payment predates a fine
/// - [`Error::MissingSetting`] if no dues price is configured, even for fines-only payments
#[instrument(skip(db, settings))]
pub async fn register_combined_payment<P>(
    db: &DatabaseConnection,
    settings: &P,
    payment: CombinedPayment,
    now: DateTime<Utc>,
) -> Result<PaymentReceipt>
where
    P: SettingsProvider,
{
    let periods = validate_request(&payment)?;
    let paid_at = payment.paid_at.unwrap_or(now);
    let national_id = payment.national_id.as_str();

    let txn = db.begin().await?;

    players::require_player(&txn, national_id).await?;

    for period in &periods {
        if dues::get_dues_payment(&txn, national_id, *period)
            .await?
            .is_some()
        {
            warn!(
                "Rejected combined payment for {}: {} already paid",
                national_id, period
            );
            return Err(Error::DuesAlreadyPaid {
                month: period.month,
                year: period.year,
            });
        }
    }

    let mut pending_fines = Vec::with_capacity(payment.fine_ids.len());
    for fine_id in &payment.fine_ids {
        let fine = fines::get_fine(&txn, *fine_id)
            .await?
            .ok_or(Error::FineNotFound { fine_id: *fine_id })?;
        if fine.player_id != national_id || fine.is_paid {
            warn!(
                "Rejected combined payment for {}: fine {} not payable",
                national_id, fine_id
            );
            return Err(Error::FineNotPayable { fine_id: *fine_id });
        }
        if paid_at.date_naive() < fine.fined_on {
            return Err(Error::InvalidDate {
                message: format!(
                    "payment date {} precedes fine date {}",
                    paid_at.date_naive(),
                    fine.fined_on
                ),
            });
        }
        pending_fines.push(fine);
    }

    // No payment of any kind is taken without a configured dues price
    let dues_price = settings.monthly_dues(&txn).await?;

    let mut dues_rows = Vec::with_capacity(periods.len());
    for period in &periods {
        let row = dues::insert_dues_payment(&txn, national_id, *period, dues_price, paid_at).await?;
        dues_rows.push(row);
    }

    let mut paid_fines = Vec::with_capacity(pending_fines.len());
    for fine in pending_fines {
        let mut active_model: fine::ActiveModel = fine.into();
        active_model.is_paid = Set(true);
        active_model.paid_at = Set(Some(paid_at));
        paid_fines.push(active_model.update(&txn).await?);
    }

    let account_settled = players::refresh_account_settled(&txn, national_id).await?;

    txn.commit().await?;

    let receipt = PaymentReceipt {
        national_id: national_id.to_string(),
        paid_at,
        dues_total: dues_rows.iter().map(|d| d.amount).sum(),
        fines_total: paid_fines.iter().map(|f| f.amount).sum(),
        dues: dues_rows,
        fines: paid_fines,
        account_settled,
    };

    info!(
        "Combined payment for {}: {} period(s), {} fine(s), total {:.2}",
        receipt.national_id,
        receipt.dues.len(),
        receipt.fines.len(),
        receipt.total()
    );
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::settings::{FixedSettings, StoredSettings},
        entities::{DuesPayment, Fine},
        test_utils::*,
    };
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn paid_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 18, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_combined_payment_settles_dues_and_fines() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        set_dues_price(&db, 20000.0).await?;
        let fine_a = create_test_fine(&db, "1001", "Late arrival", 2000.0, date(2024, 3, 1)).await?;
        let fine_b = create_test_fine(&db, "1001", "Yellow card", 5000.0, date(2024, 3, 2)).await?;

        let receipt = register_combined_payment(
            &db,
            &StoredSettings,
            CombinedPayment {
                national_id: "1001".to_string(),
                periods: vec![ym(2024, 2), ym(2024, 1)],
                fine_ids: vec![fine_a.id, fine_b.id],
                paid_at: None,
            },
            paid_at(),
        )
        .await?;

        assert_eq!(receipt.dues.len(), 2);
        assert_eq!(receipt.dues[0].month, 1);
        assert_eq!(receipt.dues_total, 40000.0);
        assert_eq!(receipt.fines_total, 7000.0);
        assert_eq!(receipt.total(), 47000.0);
        assert!(receipt.account_settled);
        assert!(receipt.fines.iter().all(|f| f.paid_at == Some(paid_at())));
        assert!(receipt.dues.iter().all(|d| d.paid_at == paid_at()));

        let player = players::require_player(&db, "1001").await?;
        assert!(player.account_settled);
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_fine_payment_keeps_player_unsettled() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let fine_a = create_test_fine(&db, "1001", "Late arrival", 2000.0, date(2024, 3, 1)).await?;
        create_test_fine(&db, "1001", "Yellow card", 5000.0, date(2024, 3, 2)).await?;

        let receipt = register_combined_payment(
            &db,
            &FixedSettings::new(20000.0),
            CombinedPayment {
                national_id: "1001".to_string(),
                fine_ids: vec![fine_a.id],
                ..Default::default()
            },
            paid_at(),
        )
        .await?;

        assert!(receipt.dues.is_empty());
        assert!(!receipt.account_settled);
        Ok(())
    }

    #[tokio::test]
    async fn test_already_paid_period_rejects_whole_request() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let settings = FixedSettings::new(20000.0);
        dues::record_dues_payment(&db, &settings, "1001", ym(2024, 1), now()).await?;
        let fine = create_test_fine(&db, "1001", "Late arrival", 2000.0, date(2024, 3, 1)).await?;

        let dues_before = DuesPayment::find().count(&db).await?;

        let result = register_combined_payment(
            &db,
            &settings,
            CombinedPayment {
                national_id: "1001".to_string(),
                periods: vec![ym(2024, 2), ym(2024, 1)],
                fine_ids: vec![fine.id],
                paid_at: None,
            },
            paid_at(),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::DuesAlreadyPaid { month: 1, year: 2024 })
        ));

        assert_eq!(DuesPayment::find().count(&db).await?, dues_before);
        let reloaded = fines::get_fine(&db, fine.id).await?.unwrap();
        assert!(!reloaded.is_paid);
        assert!(reloaded.paid_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_foreign_or_paid_fine_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        create_test_player(&db, "1002", date(2024, 1, 1)).await?;
        let foreign = create_test_fine(&db, "1002", "Late arrival", 2000.0, date(2024, 3, 1)).await?;
        let settings = FixedSettings::new(20000.0);

        let result = register_combined_payment(
            &db,
            &settings,
            CombinedPayment {
                national_id: "1001".to_string(),
                periods: vec![ym(2024, 1)],
                fine_ids: vec![foreign.id],
                paid_at: None,
            },
            paid_at(),
        )
        .await;
        assert!(matches!(result, Err(Error::FineNotPayable { .. })));
        assert_eq!(dues::count_dues_for_player(&db, "1001").await?, 0);

        let own = create_test_fine(&db, "1001", "Yellow card", 5000.0, date(2024, 3, 1)).await?;
        fines::set_fine_paid(&db, own.id, true, paid_at()).await?;
        let result = register_combined_payment(
            &db,
            &settings,
            CombinedPayment {
                national_id: "1001".to_string(),
                fine_ids: vec![own.id],
                ..Default::default()
            },
            paid_at(),
        )
        .await;
        assert!(matches!(result, Err(Error::FineNotPayable { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_price_rolls_back_fine_payments() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let fine = create_test_fine(&db, "1001", "Late arrival", 2000.0, date(2024, 3, 1)).await?;

        let result = register_combined_payment(
            &db,
            &StoredSettings,
            CombinedPayment {
                national_id: "1001".to_string(),
                periods: vec![ym(2024, 1)],
                fine_ids: vec![fine.id],
                paid_at: None,
            },
            paid_at(),
        )
        .await;
        assert!(matches!(result, Err(Error::MissingSetting { .. })));

        assert_eq!(Fine::find().filter(fine::Column::IsPaid.eq(true)).count(&db).await?, 0);
        assert_eq!(dues::count_dues_for_player(&db, "1001").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_fines_only_payment_requires_dues_price() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let fine = create_test_fine(&db, "1001", "Late arrival", 2000.0, date(2024, 3, 1)).await?;

        let result = register_combined_payment(
            &db,
            &StoredSettings,
            CombinedPayment {
                national_id: "1001".to_string(),
                fine_ids: vec![fine.id],
                ..Default::default()
            },
            paid_at(),
        )
        .await;
        assert!(matches!(result, Err(Error::MissingSetting { .. })));

        let reloaded = fines::get_fine(&db, fine.id).await?.unwrap();
        assert!(!reloaded.is_paid);
        assert!(reloaded.paid_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_fine_rejects_whole_request() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_player(&db, "1001", date(2024, 1, 1)).await?;
        let settings = FixedSettings::new(20000.0);

        let result = register_combined_payment(
            &db,
            &settings,
            CombinedPayment {
                national_id: "1001".to_string(),
                periods: vec![ym(2024, 1), ym(2024, 2)],
                fine_ids: vec![404],
                paid_at: None,
            },
            paid_at(),
        )
        .await;
        assert!(matches!(result, Err(Error::FineNotFound { fine_id: 404 })));
        assert_eq!(dues::count_dues_for_player(&db, "1001").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_requests_fail_before_any_query() -> Result<()> {
        // No query results are queued, so reaching the database would error out
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let settings = FixedSettings::new(20000.0);

        let empty = register_combined_payment(
            &db,
            &settings,
            CombinedPayment {
                national_id: "1001".to_string(),
                ..Default::default()
            },
            paid_at(),
        )
        .await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        let repeated = register_combined_payment(
            &db,
            &settings,
            CombinedPayment {
                national_id: "1001".to_string(),
                periods: vec![ym(2024, 1), ym(2024, 1)],
                ..Default::default()
            },
            paid_at(),
        )
        .await;
        assert!(matches!(repeated, Err(Error::Validation { .. })));

        let bad_month = register_combined_payment(
            &db,
            &settings,
            CombinedPayment {
                national_id: "1001".to_string(),
                periods: vec![YearMonth { year: 2024, month: 13 }],
                ..Default::default()
            },
            paid_at(),
        )
        .await;
        assert!(matches!(bad_month, Err(Error::InvalidPeriod { .. })));
        Ok(())
    }
}
