//! Group contributions - one fine per active player, created as a single batch.

use crate::{
    core::{
        fines::{self, GroupTag},
        players,
    },
    entities::{Fine, FineCause, Player, fine, player},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

const MIN_CONCEPT_LEN: usize = 3;

/// Outcome of [`create_group_contribution`].
#[derive(Debug, Clone)]
pub struct GroupContributionResult {
    /// Batch ID shared by every fine created
    pub group_id: String,
    /// Description stamped on every fine
    pub concept: String,
    /// Date of the fines
    pub fined_on: NaiveDate,
    /// One per active player
    pub fines_created: usize,
}

/// Aggregate view of one batch.
#[derive(Debug, Clone)]
pub struct GroupContributionSummary {
    /// Batch ID
    pub group_id: String,
    /// Batch description
    pub concept: String,
    /// Description of the cause the batch was charged under
    pub cause_description: String,
    /// Date of the fines
    pub fined_on: NaiveDate,
    /// Amount charged to each player
    pub unit_amount: f64,
    /// Fines in the batch
    pub total_fines: usize,
    /// Fines already paid
    pub paid: usize,
    /// Fines still unpaid
    pub pending: usize,
    /// Percentage of fines paid, rounded to one decimal
    pub percent_paid: f64,
}

/// One member's line in a batch.
#[derive(Debug, Clone)]
pub struct GroupContributionMember {
    /// The member's fine
    pub fine: fine::Model,
    /// Name of the fined player
    pub player_name: String,
}

#[allow(clippy::cast_precision_loss)]
fn percent_paid(paid: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = paid as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

/// Creates one fine per active player, all sharing a fresh batch ID.
///
/// Either every fine is created or none is.
///
/// # Errors
/// - [`Error::FineCauseNotFound`] for unknown causes
/// - [`Error::InvalidDate`] for dates outside the allowed fine window
/// - [`Error::Validation`] for a concept shorter than 3 characters or when there are no active players
#[instrument(skip(db))]
pub async fn create_group_contribution(
    db: &DatabaseConnection,
    cause_id: i64,
    concept: &str,
    fined_on: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<GroupContributionResult> {
    let concept = concept.trim();
    if concept.chars().count() < MIN_CONCEPT_LEN {
        return Err(Error::Validation {
            message: format!("Group contribution concept needs at least {MIN_CONCEPT_LEN} characters"),
        });
    }
    let fined_on = fined_on.unwrap_or(today);
    fines::validate_fine_date(fined_on, today)?;

    let txn = db.begin().await?;

    let cause = fines::require_cause(&txn, cause_id).await?;
    let active_players = players::list_players(&txn, true).await?;
    if active_players.is_empty() {
        return Err(Error::Validation {
            message: "There are no active players to fine".to_string(),
        });
    }

    let group_id = Uuid::new_v4().to_string();
    let tag = GroupTag {
        group_id: &group_id,
        concept,
    };

    for member in &active_players {
        fines::insert_fine(&txn, &member.national_id, &cause, fined_on, Some(tag)).await?;
    }

    let player_ids: Vec<String> = active_players
        .iter()
        .map(|p| p.national_id.clone())
        .collect();
    Player::update_many()
        .col_expr(player::Column::AccountSettled, Expr::value(false))
        .filter(player::Column::NationalId.is_in(player_ids))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    info!(
        "Group contribution {} '{}' created {} fines of {:.2}",
        group_id,
        concept,
        active_players.len(),
        cause.amount
    );

    Ok(GroupContributionResult {
        group_id,
        concept: concept.to_string(),
        fined_on,
        fines_created: active_players.len(),
    })
}

/// Lists every batch with its paid/pending breakdown, newest first.
pub async fn list_group_contributions(
    db: &DatabaseConnection,
) -> Result<Vec<GroupContributionSummary>> {
    let group_fines = Fine::find()
        .filter(fine::Column::IsGroupContribution.eq(true))
        .order_by_asc(fine::Column::Id)
        .all(db)
        .await?;

    let causes: HashMap<i64, String> = FineCause::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.description))
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut by_group: HashMap<String, Vec<fine::Model>> = HashMap::new();
    for fine in group_fines {
        let Some(group_id) = fine.group_id.clone() else {
            continue;
        };
        if !by_group.contains_key(&group_id) {
            order.push(group_id.clone());
        }
        by_group.entry(group_id).or_default().push(fine);
    }

    let mut summaries: Vec<GroupContributionSummary> = order
        .into_iter()
        .filter_map(|group_id| {
            let members = by_group.remove(&group_id)?;
            let first = members.first()?;
            let total_fines = members.len();
            let paid = members.iter().filter(|f| f.is_paid).count();
            Some(GroupContributionSummary {
                concept: first.group_concept.clone().unwrap_or_default(),
                cause_description: causes.get(&first.cause_id).cloned().unwrap_or_default(),
                fined_on: first.fined_on,
                unit_amount: first.amount,
                total_fines,
                paid,
                pending: total_fines - paid,
                percent_paid: percent_paid(paid, total_fines),
                group_id,
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.fined_on.cmp(&a.fined_on));
    Ok(summaries)
}

/// Lists the fines of one batch with the player each belongs to.
///
/// # Errors
/// Returns [`Error::GroupContributionNotFound`] for unknown batch IDs.
pub async fn get_group_contribution_detail(
    db: &DatabaseConnection,
    group_id: &str,
) -> Result<Vec<GroupContributionMember>> {
    let rows = Fine::find()
        .filter(fine::Column::GroupId.eq(group_id))
        .find_also_related(Player)
        .order_by_asc(fine::Column::Id)
        .all(db)
        .await?;

    if rows.is_empty() {
        return Err(Error::GroupContributionNotFound {
            group_id: group_id.to_string(),
        });
    }

    Ok(rows
        .into_iter()
        .map(|(fine, player)| GroupContributionMember {
            player_name: player.map(|p| p.name).unwrap_or_default(),
            fine,
        })
        .collect())
}
