//! Player entity - Represents a registered club member.
//!
//! Players are identified by their national ID, which never changes after
//! registration. The enrollment date anchors the monthly-dues obligation window,
//! and the position decides whether monthly dues apply at all.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Playing position, stored as text. Goalkeepers are exempt from monthly dues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Position {
    /// Ordinary field player, owes monthly dues
    #[sea_orm(string_value = "field")]
    Field,
    /// Goalkeeper, exempt from monthly dues
    #[sea_orm(string_value = "goalkeeper")]
    Goalkeeper,
}

impl Position {
    /// Whether players in this position owe monthly dues.
    #[must_use]
    pub const fn owes_monthly_dues(self) -> bool {
        matches!(self, Self::Field)
    }
}

/// Player database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "players")]
pub struct Model {
    /// National ID number, the immutable primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub national_id: String,
    /// Full display name
    pub name: String,
    /// Name or alias the player registered under, unique across the club
    #[sea_orm(unique)]
    pub registration_alias: String,
    /// Optional contact phone number
    pub phone: Option<String>,
    /// Day the player joined; monthly dues are owed from this month onwards
    pub enrollment_date: Date,
    /// Playing position
    pub position: Position,
    /// Cached "no pending fines" flag, recomputed whenever fines change
    pub account_settled: bool,
    /// Whether the player is currently on the team
    pub is_active: bool,
    /// When the player was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Player and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One player has many monthly dues payments
    #[sea_orm(has_many = "super::dues_payment::Entity")]
    DuesPayments,
    /// One player has many fines
    #[sea_orm(has_many = "super::fine::Entity")]
    Fines,
    /// One player has many other contributions
    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,
}

impl Related<super::dues_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DuesPayments.def()
    }
}

impl Related<super::fine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fines.def()
    }
}

impl Related<super::contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
