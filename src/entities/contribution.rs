//! Contribution entity - Ad-hoc money a player hands in outside of dues and fines
//! (raffle proceeds, donations). Counted as income by the financial rollups.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Other-contribution database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// National ID of the contributing player
    pub player_id: String,
    /// What the money is for
    pub concept: String,
    pub amount: f64,
    pub contributed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::player::Entity",
        from = "Column::PlayerId",
        to = "super::player::Column::NationalId"
    )]
    Player,
}

impl Related<super::player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Player.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
