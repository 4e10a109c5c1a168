//! Dues payment entity - One row per paid monthly-dues period.
//!
//! At most one row exists per `(player_id, month, year)`. The amount is copied
//! from the configured dues price when the row is written, so later price
//! changes never rewrite history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Monthly dues payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dues_payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// National ID of the paying player
    pub player_id: String,
    /// Calendar month covered (1-12)
    pub month: u32,
    /// Calendar year covered
    pub year: i32,
    /// Amount charged, frozen at insertion time
    pub amount: f64,
    /// When the payment was registered
    pub paid_at: DateTimeUtc,
}

/// Defines relationships between `DuesPayment` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one player
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
