//! Fine cause entity - Catalog of reasons a fine can be imposed.
//!
//! The amount here is only a template: fines copy it when they are created,
//! so editing a cause never changes fines that already exist.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fine cause database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fine_causes")]
pub struct Model {
    /// Unique identifier for the cause
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable description (e.g., "Late to practice")
    #[sea_orm(unique)]
    pub description: String,
    /// Current price applied to newly imposed fines
    pub amount: f64,
}

/// Defines relationships between `FineCause` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One cause has many fines
    #[sea_orm(has_many = "super::fine::Entity")]
    Fines,
}

impl Related<super::fine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
