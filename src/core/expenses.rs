//! Expense ledger and expense categories.
//!
//! Every expense belongs to exactly one category, and a category cannot be
//! removed while expenses still reference it.

use crate::{
    entities::{Expense, ExpenseCategory, expense, expense_category},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::{info, instrument};

/// Editable category fields. `None` leaves a field unchanged; an empty
/// description clears it.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: "Category name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Finds a category by ID.
pub async fn get_category<C>(db: &C, category_id: i64) -> Result<Option<expense_category::Model>>
where
    C: ConnectionTrait,
{
    ExpenseCategory::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by its exact name.
pub async fn get_category_by_name<C>(
    db: &C,
    name: &str,
) -> Result<Option<expense_category::Model>>
where
    C: ConnectionTrait,
{
    ExpenseCategory::find()
        .filter(expense_category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all categories ordered by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<expense_category::Model>> {
    ExpenseCategory::find()
        .order_by_asc(expense_category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a category with a unique name.
pub async fn create_category(
    db: &DatabaseConnection,
    name: String,
    description: Option<String>,
) -> Result<expense_category::Model> {
    let name = require_name(&name)?;
    if get_category_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateName {
            entity: "expense category",
            name,
        });
    }

    let category = expense_category::ActiveModel {
        name: Set(name),
        description: Set(normalize_optional(description)),
        ..Default::default()
    };
    let result = category.insert(db).await?;
    info!("Created expense category '{}'", result.name);
    Ok(result)
}

/// Renames or re-describes a category.
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    patch: CategoryPatch,
) -> Result<expense_category::Model> {
    let existing = get_category(db, category_id)
        .await?
        .ok_or(Error::ExpenseCategoryNotFound { category_id })?;
    let mut active_model: expense_category::ActiveModel = existing.into();

    if let Some(name) = patch.name {
        let name = require_name(&name)?;
        if let Some(other) = get_category_by_name(db, &name).await? {
            if other.id != category_id {
                return Err(Error::DuplicateName {
                    entity: "expense category",
                    name,
                });
            }
        }
        active_model.name = Set(name);
    }
    if patch.description.is_some() {
        active_model.description = Set(normalize_optional(patch.description));
    }

    let updated = active_model.update(db).await?;
    info!("Updated expense category {}", updated.id);
    Ok(updated)
}

/// Deletes a category that no expense references.
///
/// # Errors
/// Returns [`Error::InUse`] while expenses reference the category.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let category = get_category(db, category_id)
        .await?
        .ok_or(Error::ExpenseCategoryNotFound { category_id })?;

    let references = Expense::find()
        .filter(expense::Column::CategoryId.eq(category_id))
        .count(db)
        .await?;
    if references > 0 {
        return Err(Error::InUse {
            entity: "expense category",
            name: category.name,
            references,
        });
    }

    let name = category.name.clone();
    category.delete(db).await?;
    info!("Deleted expense category '{}'", name);
    Ok(())
}

/// Records money spent under an existing category.
#[instrument(skip(db))]
pub async fn record_expense(
    db: &DatabaseConnection,
    category_id: i64,
    concept: &str,
    amount: f64,
    spent_at: DateTime<Utc>,
    receipt: Option<String>,
    notes: Option<String>,
) -> Result<expense::Model> {
    let concept = concept.trim();
    if concept.is_empty() {
        return Err(Error::Validation {
            message: "Expense concept cannot be empty".to_string(),
        });
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    if get_category(db, category_id).await?.is_none() {
        return Err(Error::ExpenseCategoryNotFound { category_id });
    }

    let expense = expense::ActiveModel {
        category_id: Set(category_id),
        concept: Set(concept.to_string()),
        amount: Set(amount),
        spent_at: Set(spent_at),
        receipt: Set(normalize_optional(receipt)),
        notes: Set(normalize_optional(notes)),
        ..Default::default()
    };
    let result = expense.insert(db).await?;
    info!(
        "Recorded expense '{}' of {:.2} in category {}",
        result.concept, result.amount, category_id
    );
    Ok(result)
}

/// Most recent expenses first, optionally capped at `limit` rows.
pub async fn list_expenses(
    db: &DatabaseConnection,
    limit: Option<u64>,
) -> Result<Vec<expense::Model>> {
    Expense::find()
        .order_by_desc(expense::Column::SpentAt)
        .order_by_desc(expense::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes an expense.
pub async fn delete_expense(db: &DatabaseConnection, expense_id: i64) -> Result<()> {
    let result = Expense::delete_by_id(expense_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::ExpenseNotFound { expense_id });
    }
    info!("Deleted expense {}", expense_id);
    Ok(())
}
