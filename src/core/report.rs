//! Dashboard rollups and display formatting.
//!
//! This module turns the ledgers into the overviews an administrator looks at:
//! headline counts, a ranking of players by outstanding fines, and a per-player
//! grid of the dues paid in a year. Everything returns plain data; the
//! `format_*` helpers produce the one-line text renderings used in logs.

use crate::{
    core::{
        finance::{self, DateWindow},
        period::YearMonth,
        players,
        status::{self, AccountStatus},
    },
    entities::{Contribution, DuesPayment, Fine, Player, Position, dues_payment, fine},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, prelude::*};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Headline figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Every registered player, active or not
    pub total_players: usize,
    /// Players currently on the team
    pub active_players: usize,
    /// Active players whose account is up to date
    pub up_to_date: usize,
    /// Active players with at least one unpaid fine
    pub with_pending_fines: usize,
    /// Sum of all unpaid fines in the club
    pub pending_fines_amount: f64,
    /// All-time income minus all-time expenses
    pub balance: f64,
}

/// One line of the outstanding-fines ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FineRankingEntry {
    /// Player's national ID
    pub national_id: String,
    /// Player's display name
    pub name: String,
    /// Number of unpaid fines
    pub pending_fines: usize,
    /// Sum of unpaid fines
    pub pending_amount: f64,
}

/// State of a single month in the yearly dues grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonthState {
    /// A payment is on record
    Paid,
    /// The month is owed and unpaid
    Pending,
    /// Before enrollment, after the current month, or the player is exempt
    NotApplicable,
}

/// One month of one player in the yearly dues grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCell {
    /// Month of the year, 1-12
    pub month: u32,
    /// Payment state of the month
    pub state: MonthState,
    /// Amount recorded for the month, when paid
    pub amount: Option<f64>,
}

/// One player's row in the yearly dues grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuesGridRow {
    /// Player's national ID
    pub national_id: String,
    /// Player's display name
    pub name: String,
    /// Player's position
    pub position: Position,
    /// Exactly twelve cells, January first
    pub months: Vec<MonthCell>,
    /// Dues paid for the year
    pub paid_total: f64,
    /// Sum of the player's unpaid fines, any year
    pub pending_fines_amount: f64,
}

/// A player singled out by [`fine_statistics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FineLeader {
    /// Player's national ID
    pub national_id: String,
    /// Player's display name
    pub name: String,
    /// Fines of the player inside the window
    pub fines: usize,
    /// Sum of those fines
    pub amount: f64,
}

/// Fine counts and amounts over a window of fine dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FineStatistics {
    /// The window the figures cover, applied to `fined_on`
    pub window: DateWindow,
    /// Fines dated inside the window
    pub total_fines: usize,
    /// Of those, still unpaid
    pub pending_fines: usize,
    /// Of those, settled
    pub paid_fines: usize,
    /// Sum of the fines in the window
    pub total_amount: f64,
    /// Sum of the unpaid ones
    pub pending_amount: f64,
    /// Sum of the settled ones
    pub paid_amount: f64,
    /// Fines in the window divided by every registered player, two decimals
    pub average_fines_per_player: f64,
    /// Most fines in the window; ties go to more money, then name
    pub most_fined: Option<FineLeader>,
    /// Most money fined in the window; ties go to more fines, then name
    pub highest_amount: Option<FineLeader>,
}

/// One of the top contributors in [`PlayerStatistics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorEntry {
    /// Player's national ID
    pub national_id: String,
    /// Player's display name
    pub name: String,
    /// All-time contributions of the player
    pub total: f64,
}

/// Roster figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatistics {
    /// Every registered player
    pub total_players: usize,
    /// Players currently on the team
    pub active_players: usize,
    /// Registered players no longer on the team
    pub inactive_players: usize,
    /// Active goalkeepers
    pub active_goalkeepers: usize,
    /// Registered players with no unpaid fine
    pub without_pending_fines: usize,
    /// Players with a dues payment for the month of `today`
    pub paid_current_month: usize,
    /// All-time contributions from every player
    pub total_contributions: f64,
    /// `total_contributions` over every registered player
    pub average_contributions_per_player: f64,
    /// At most three players, largest total first, ties by name
    pub top_contributors: Vec<ContributorEntry>,
}

/// Builds the dashboard headline figures as of `today`.
///
/// # Arguments
/// * `db` - Database connection
/// * `today` - Day the account statuses are evaluated on
///
/// # Returns
/// A [`DashboardSummary`] with player counts, outstanding fines and balance
pub async fn dashboard_summary(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<DashboardSummary> {
    let total_players = players::list_players(db, false).await?.len();
    let active = status::list_player_statuses(db, true, today).await?;

    let pending_fines_amount = Fine::find()
        .filter(fine::Column::IsPaid.eq(false))
        .all(db)
        .await?
        .iter()
        .map(|f| f.amount)
        .sum();

    Ok(DashboardSummary {
        total_players,
        active_players: active.len(),
        up_to_date: active.iter().filter(|s| s.is_up_to_date).count(),
        with_pending_fines: active.iter().filter(|s| s.pending_fines > 0).count(),
        pending_fines_amount,
        balance: finance::current_balance(db).await?,
    })
}

/// Ranks players by outstanding fines.
///
/// Players are ordered by number of unpaid fines, then by amount owed, then by
/// name. Players without unpaid fines are left out.
///
/// # Arguments
/// * `db` - Database connection
/// * `limit` - Maximum number of entries to return; `None` returns all
pub async fn fine_ranking(
    db: &DatabaseConnection,
    limit: Option<usize>,
) -> Result<Vec<FineRankingEntry>> {
    let names: HashMap<String, String> = Player::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.national_id, p.name))
        .collect();

    let mut totals: HashMap<String, (usize, f64)> = HashMap::new();
    for fine in Fine::find()
        .filter(fine::Column::IsPaid.eq(false))
        .all(db)
        .await?
    {
        let entry = totals.entry(fine.player_id).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += fine.amount;
    }

    let mut ranking: Vec<FineRankingEntry> = totals
        .into_iter()
        .map(|(national_id, (pending_fines, pending_amount))| FineRankingEntry {
            name: names.get(&national_id).cloned().unwrap_or_default(),
            national_id,
            pending_fines,
            pending_amount,
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.pending_fines
            .cmp(&a.pending_fines)
            .then_with(|| b.pending_amount.total_cmp(&a.pending_amount))
            .then_with(|| a.name.cmp(&b.name))
    });
    if let Some(limit) = limit {
        ranking.truncate(limit);
    }
    Ok(ranking)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fine statistics over the fines whose `fined_on` falls in `window`.
///
/// A fine counts when the start of its date lies inside the window. The
/// per-player average divides by every registered player, active or not.
///
/// # Arguments
/// * `db` - Database connection
/// * `window` - Window over fine dates
///
/// # Errors
/// - [`crate::errors::Error::Validation`] if the window's start is not before its end
/// - [`crate::errors::Error::Database`] on query failure
#[allow(clippy::cast_precision_loss)]
pub async fn fine_statistics(
    db: &DatabaseConnection,
    window: &DateWindow,
) -> Result<FineStatistics> {
    window.validate()?;

    let names: HashMap<String, String> = Player::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.national_id, p.name))
        .collect();

    let fines: Vec<fine::Model> = Fine::find()
        .all(db)
        .await?
        .into_iter()
        .filter(|f| window.contains_date(f.fined_on))
        .collect();

    let mut per_player: HashMap<String, (usize, f64)> = HashMap::new();
    let (mut pending_fines, mut pending_amount) = (0, 0.0);
    let (mut paid_fines, mut paid_amount) = (0, 0.0);
    for fine in &fines {
        if fine.is_paid {
            paid_fines += 1;
            paid_amount += fine.amount;
        } else {
            pending_fines += 1;
            pending_amount += fine.amount;
        }
        let entry = per_player.entry(fine.player_id.clone()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += fine.amount;
    }

    let leaders: Vec<FineLeader> = per_player
        .into_iter()
        .map(|(national_id, (fines, amount))| FineLeader {
            name: names.get(&national_id).cloned().unwrap_or_default(),
            national_id,
            fines,
            amount,
        })
        .collect();

    let most_fined = leaders
        .iter()
        .min_by(|a, b| {
            b.fines
                .cmp(&a.fines)
                .then_with(|| b.amount.total_cmp(&a.amount))
                .then_with(|| a.name.cmp(&b.name))
        })
        .cloned();
    let highest_amount = leaders
        .iter()
        .min_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| b.fines.cmp(&a.fines))
                .then_with(|| a.name.cmp(&b.name))
        })
        .cloned();

    let average_fines_per_player = if names.is_empty() {
        0.0
    } else {
        round_cents(fines.len() as f64 / names.len() as f64)
    };

    debug!(
        "Fine statistics: {} fines, {} pending",
        fines.len(),
        pending_fines
    );
    Ok(FineStatistics {
        window: *window,
        total_fines: fines.len(),
        pending_fines,
        paid_fines,
        total_amount: pending_amount + paid_amount,
        pending_amount,
        paid_amount,
        average_fines_per_player,
        most_fined,
        highest_amount,
    })
}

/// Roster statistics as of `today`.
///
/// # Arguments
/// * `db` - Database connection
/// * `today` - Its month is the one checked for dues payments
///
/// # Errors
/// [`crate::errors::Error::Database`] on query failure
#[allow(clippy::cast_precision_loss)]
pub async fn player_statistics(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<PlayerStatistics> {
    let roster = players::list_players(db, false).await?;
    let current = YearMonth::from_date(today);

    let paid_current_month: HashSet<String> = DuesPayment::find()
        .filter(dues_payment::Column::Year.eq(current.year))
        .filter(dues_payment::Column::Month.eq(current.month))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.player_id)
        .collect();

    let with_pending_fines: HashSet<String> = Fine::find()
        .filter(fine::Column::IsPaid.eq(false))
        .all(db)
        .await?
        .into_iter()
        .map(|f| f.player_id)
        .collect();

    let mut contributed: HashMap<String, f64> = HashMap::new();
    for contribution in Contribution::find().all(db).await? {
        *contributed.entry(contribution.player_id).or_insert(0.0) += contribution.amount;
    }
    let total_contributions: f64 = contributed.values().sum();

    let mut top_contributors: Vec<ContributorEntry> = roster
        .iter()
        .filter_map(|p| {
            contributed.get(&p.national_id).map(|total| ContributorEntry {
                national_id: p.national_id.clone(),
                name: p.name.clone(),
                total: *total,
            })
        })
        .collect();
    top_contributors.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_contributors.truncate(3);

    let active_players = roster.iter().filter(|p| p.is_active).count();
    let average_contributions_per_player = if roster.is_empty() {
        0.0
    } else {
        round_cents(total_contributions / roster.len() as f64)
    };

    Ok(PlayerStatistics {
        total_players: roster.len(),
        active_players,
        inactive_players: roster.len() - active_players,
        active_goalkeepers: roster
            .iter()
            .filter(|p| p.is_active && p.position == Position::Goalkeeper)
            .count(),
        without_pending_fines: roster
            .iter()
            .filter(|p| !with_pending_fines.contains(&p.national_id))
            .count(),
        paid_current_month: roster
            .iter()
            .filter(|p| paid_current_month.contains(&p.national_id))
            .count(),
        total_contributions,
        average_contributions_per_player,
        top_contributors,
    })
}

fn month_state(
    position: Position,
    enrolled: YearMonth,
    current: YearMonth,
    period: YearMonth,
    paid: bool,
) -> MonthState {
    if paid {
        MonthState::Paid
    } else if position.owes_monthly_dues() && period >= enrolled && period <= current {
        MonthState::Pending
    } else {
        MonthState::NotApplicable
    }
}

/// Builds the per-player, per-month dues grid of `year` for active players.
///
/// # Arguments
/// * `db` - Database connection
/// * `year` - Calendar year of the grid
/// * `today` - Months after the current one are never marked pending
///
/// # Returns
/// One [`DuesGridRow`] per active player, ordered by name
pub async fn yearly_dues_grid(
    db: &DatabaseConnection,
    year: i32,
    today: NaiveDate,
) -> Result<Vec<DuesGridRow>> {
    let roster = players::list_players(db, true).await?;
    let current = YearMonth::from_date(today);

    let mut paid: HashMap<(String, u32), f64> = HashMap::new();
    for payment in DuesPayment::find()
        .filter(dues_payment::Column::Year.eq(year))
        .all(db)
        .await?
    {
        paid.insert((payment.player_id, payment.month), payment.amount);
    }

    let mut pending_fines: HashMap<String, f64> = HashMap::new();
    for fine in Fine::find()
        .filter(fine::Column::IsPaid.eq(false))
        .all(db)
        .await?
    {
        *pending_fines.entry(fine.player_id).or_insert(0.0) += fine.amount;
    }

    Ok(roster
        .into_iter()
        .map(|player| {
            let enrolled = YearMonth::from_date(player.enrollment_date);
            let months: Vec<MonthCell> = (1..=12)
                .map(|month| {
                    let amount = paid.get(&(player.national_id.clone(), month)).copied();
                    let period = YearMonth { year, month };
                    MonthCell {
                        month,
                        state: month_state(
                            player.position,
                            enrolled,
                            current,
                            period,
                            amount.is_some(),
                        ),
                        amount,
                    }
                })
                .collect();
            DuesGridRow {
                paid_total: months.iter().filter_map(|c| c.amount).sum(),
                pending_fines_amount: pending_fines
                    .get(&player.national_id)
                    .copied()
                    .unwrap_or(0.0),
                national_id: player.national_id,
                name: player.name,
                position: player.position,
                months,
            }
        })
        .collect())
}

/// Formats a money amount with thousands separators and two decimals.
///
/// # Returns
/// Formatted string like "$20,000.00" or "-$1,500.50"
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Generates a one-line summary of a player's account status.
///
/// # Returns
/// Formatted string like "Ana (1001) | OWES DUES | fines: 0 ($0.00) | months pending: 2"
#[must_use]
pub fn format_status_line(status: &AccountStatus) -> String {
    let months = if status.position.owes_monthly_dues() {
        status.pending_months.len().to_string()
    } else {
        "exempt".to_string()
    };
    format!(
        "{} ({}) | {} | fines: {} ({}) | months pending: {}",
        status.name,
        status.national_id,
        status.label,
        status.pending_fines,
        format_amount(status.pending_fines_amount),
        months
    )
}
