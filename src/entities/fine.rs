//! Fine entity - A monetary penalty imposed on one player.
//!
//! Each fine snapshots its cause's amount at creation. `paid_at` is set exactly
//! when `is_paid` is true. Fines created by a group contribution share a
//! `group_id` and carry the contribution's description in `group_concept`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fine database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fines")]
pub struct Model {
    /// Unique identifier for the fine
    #[sea_orm(primary_key)]
    pub id: i64,
    /// National ID of the fined player
    pub player_id: String,
    /// Cause the fine was imposed for
    pub cause_id: i64,
    /// Amount owed, copied from the cause at creation time
    pub amount: f64,
    /// Day the fine applies to
    pub fined_on: Date,
    /// Whether the fine has been settled
    pub is_paid: bool,
    /// When the fine was settled; `None` while unpaid
    pub paid_at: Option<DateTimeUtc>,
    /// Whether this fine is part of a group contribution batch
    pub is_group_contribution: bool,
    /// Shared batch identifier for group contributions
    pub group_id: Option<String>,
    /// Description of the group contribution
    pub group_concept: Option<String>,
}

/// Defines relationships between Fine and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each fine belongs to one player
    #[sea_orm(
        belongs_to = "super::player::Entity",
        from = "Column::PlayerId",
        to = "super::player::Column::NationalId"
    )]
    Player,
    /// Each fine references one cause
    #[sea_orm(
        belongs_to = "super::fine_cause::Entity",
        from = "Column::CauseId",
        to = "super::fine_cause::Column::Id"
    )]
    FineCause,
}

impl Related<super::player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Player.def()
    }
}

impl Related<super::fine_cause::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FineCause.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
