//! Setting entity - Stores numeric key-value pairs for club-wide configuration.
//! Used for values like the current monthly dues price.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Setting database model - stores key-value configuration pairs
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Configuration key (e.g., `"monthly_dues"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Configuration value
    pub value: f64,
    /// What the setting controls
    pub description: Option<String>,
    /// When this configuration was last modified
    pub updated_at: DateTime,
}

/// `Setting` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
