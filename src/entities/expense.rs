//! Expense entity - Money spent by the club, always tagged with one category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Mandatory category reference
    pub category_id: i64,
    /// What the money was spent on
    pub concept: String,
    /// Amount spent
    pub amount: f64,
    /// When the expense happened
    pub spent_at: DateTimeUtc,
    /// Invoice or receipt number
    pub receipt: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each expense belongs to one category
    #[sea_orm(
        belongs_to = "super::expense_category::Entity",
        from = "Column::CategoryId",
        to = "super::expense_category::Column::Id"
    )]
    ExpenseCategory,
}

impl Related<super::expense_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
