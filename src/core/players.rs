//! Player registry - registration, lookups, allow-listed edits and the
//! active/inactive toggle.
//!
//! Players are never hard-deleted here. The national ID and enrollment date are
//! fixed at registration; everything an admin may change afterwards is listed
//! explicitly in [`PlayerPatch`].

use crate::{
    entities::{Fine, Player, Position, fine, player},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Input for [`register_player`].
#[derive(Debug, Clone)]
pub struct NewPlayer {
    /// Unique national ID, the player's primary key
    pub national_id: String,
    /// Display name
    pub name: String,
    /// Unique alias used when signing up
    pub registration_alias: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Defaults to the registration day when `None`
    pub enrollment_date: Option<NaiveDate>,
    /// Field player or goalkeeper
    pub position: Position,
}

/// The fields an admin may edit after registration. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PlayerPatch {
    /// New display name
    pub name: Option<String>,
    /// New alias; must stay unique
    pub registration_alias: Option<String>,
    /// New contact phone
    pub phone: Option<String>,
    /// New position
    pub position: Option<Position>,
}

impl PlayerPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.registration_alias.is_none()
            && self.phone.is_none()
            && self.position.is_none()
    }
}

fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: format!("Player {field} cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

/// Registers a new player. New players start active and settled.
///
/// # Errors
/// - [`Error::Validation`] for empty ID, name or alias
/// - [`Error::PlayerAlreadyExists`] if the national ID is taken
/// - [`Error::AliasInUse`] if the registration alias is taken
#[instrument(skip(db))]
pub async fn register_player(
    db: &DatabaseConnection,
    new_player: NewPlayer,
    today: NaiveDate,
) -> Result<player::Model> {
    let national_id = require_text(&new_player.national_id, "national ID")?;
    let name = require_text(&new_player.name, "name")?;
    let alias = require_text(&new_player.registration_alias, "registration alias")?;

    if get_player(db, &national_id).await?.is_some() {
        return Err(Error::PlayerAlreadyExists { national_id });
    }
    if get_player_by_alias(db, &alias).await?.is_some() {
        return Err(Error::AliasInUse { alias });
    }

    let player = player::ActiveModel {
        national_id: Set(national_id),
        name: Set(name),
        registration_alias: Set(alias),
        phone: Set(new_player.phone),
        enrollment_date: Set(new_player.enrollment_date.unwrap_or(today)),
        position: Set(new_player.position),
        account_settled: Set(true),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    };

    let result = player.insert(db).await?;
    info!(
        "Registered player {} ({}) enrolled {}",
        result.national_id, result.registration_alias, result.enrollment_date
    );
    Ok(result)
}

/// Finds a player by national ID.
pub async fn get_player<C>(db: &C, national_id: &str) -> Result<Option<player::Model>>
where
    C: ConnectionTrait,
{
    Player::find_by_id(national_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a player by national ID, failing with [`Error::PlayerNotFound`].
pub async fn require_player<C>(db: &C, national_id: &str) -> Result<player::Model>
where
    C: ConnectionTrait,
{
    get_player(db, national_id)
        .await?
        .ok_or_else(|| Error::PlayerNotFound {
            national_id: national_id.to_string(),
        })
}

/// Finds a player by registration alias.
pub async fn get_player_by_alias<C>(db: &C, alias: &str) -> Result<Option<player::Model>>
where
    C: ConnectionTrait,
{
    Player::find()
        .filter(player::Column::RegistrationAlias.eq(alias))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists players ordered by name, optionally only the active ones.
pub async fn list_players<C>(db: &C, active_only: bool) -> Result<Vec<player::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Player::find();
    if active_only {
        query = query.filter(player::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(player::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Case-insensitive substring search over name, national ID and alias.
///
/// Matching happens on Unicode-lowercased text and the term is taken literally,
/// so accented names match in any case and `%` or `_` are plain characters.
pub async fn search_players(db: &DatabaseConnection, term: &str) -> Result<Vec<player::Model>> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let roster = list_players(db, false).await?;
    let matches: Vec<player::Model> = roster
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.national_id.to_lowercase().contains(&needle)
                || p.registration_alias.to_lowercase().contains(&needle)
        })
        .collect();
    debug!("Search '{}' matched {} player(s)", needle, matches.len());
    Ok(matches)
}

/// Applies an allow-listed patch to a player.
#[instrument(skip(db))]
pub async fn update_player(
    db: &DatabaseConnection,
    national_id: &str,
    patch: PlayerPatch,
) -> Result<player::Model> {
    let existing = require_player(db, national_id).await?;
    if patch.is_empty() {
        return Ok(existing);
    }

    let mut active_model: player::ActiveModel = existing.into();

    if let Some(name) = patch.name {
        active_model.name = Set(require_text(&name, "name")?);
    }
    if let Some(alias) = patch.registration_alias {
        let alias = require_text(&alias, "registration alias")?;
        if let Some(other) = get_player_by_alias(db, &alias).await? {
            if other.national_id != national_id {
                return Err(Error::AliasInUse { alias });
            }
        }
        active_model.registration_alias = Set(alias);
    }
    if let Some(phone) = patch.phone {
        let phone = phone.trim().to_string();
        active_model.phone = Set(if phone.is_empty() { None } else { Some(phone) });
    }
    if let Some(position) = patch.position {
        active_model.position = Set(position);
    }

    let updated = active_model.update(db).await?;
    info!("Updated player {}", updated.national_id);
    Ok(updated)
}

/// Marks a player as active or inactive. Inactive players keep their history
/// but are left out of group contributions.
pub async fn set_player_active(
    db: &DatabaseConnection,
    national_id: &str,
    is_active: bool,
) -> Result<player::Model> {
    let existing = require_player(db, national_id).await?;
    let mut active_model: player::ActiveModel = existing.into();
    active_model.is_active = Set(is_active);
    let updated = active_model.update(db).await?;
    info!(
        "Player {} is now {}",
        updated.national_id,
        if is_active { "active" } else { "inactive" }
    );
    Ok(updated)
}

/// Recomputes the player's cached `account_settled` flag from their unpaid fines
/// and returns the new value.
pub async fn refresh_account_settled<C>(db: &C, national_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let unpaid = Fine::find()
        .filter(fine::Column::PlayerId.eq(national_id))
        .filter(fine::Column::IsPaid.eq(false))
        .count(db)
        .await?;
    let settled = unpaid == 0;

    Player::update_many()
        .col_expr(player::Column::AccountSettled, Expr::value(settled))
        .filter(player::Column::NationalId.eq(national_id))
        .exec(db)
        .await?;

    debug!(
        "Player {} has {} unpaid fine(s), settled = {}",
        national_id, unpaid, settled
    );
    Ok(settled)
}
