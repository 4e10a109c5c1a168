//! Financial aggregator - income, expenses and balance over a date window.
//!
//! Income is the sum of dues payments, paid fines (by payment date, at the
//! amount snapshotted on the fine) and contributions. All windows are half-open:
//! `start <= t < end`, with either bound optional.

use crate::{
    core::period::YearMonth,
    entities::{
        Contribution, DuesPayment, Expense, ExpenseCategory, Fine, contribution, dues_payment,
        expense, expense_category, fine,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{Condition, QueryOrder, QuerySelect, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Half-open time range `[start, end)`. A missing bound is open-ended.
///
/// Built only through the constructors, which reject `start >= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DateWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

fn midnight(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::InvalidDate {
            message: format!("no midnight for {date}"),
        })
}

fn month_start(period: YearMonth) -> Result<DateTime<Utc>> {
    let first = period.first_day().ok_or_else(|| Error::InvalidDate {
        message: format!("no first day for {period}"),
    })?;
    midnight(first)
}

impl DateWindow {
    /// No bounds at all.
    #[must_use]
    pub const fn all_time() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Window from `start` (inclusive) to `end` (exclusive).
    ///
    /// # Errors
    /// Returns [`Error::Validation`] unless `start < end`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::Validation {
                message: format!("Window start {start} must be before its end {end}"),
            });
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// Window from `start` (inclusive) with no end.
    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Window up to `end` (exclusive) with no start.
    #[must_use]
    pub const fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Window covering one calendar month.
    pub fn month(period: YearMonth) -> Result<Self> {
        let period = YearMonth::new(period.year, period.month)?;
        Self::between(month_start(period)?, month_start(period.next())?)
    }

    /// Window covering one calendar year.
    pub fn year(year: i32) -> Result<Self> {
        let first = YearMonth::new(year, 1)?;
        let next = YearMonth { year: year + 1, month: 1 };
        Self::between(month_start(first)?, month_start(next)?)
    }

    /// Inclusive lower bound, if any.
    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Exclusive upper bound, if any.
    #[must_use]
    pub const fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Rejects windows whose start is not before their end.
    pub(crate) fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start >= end {
                return Err(Error::Validation {
                    message: format!("Window start {start} must be before its end {end}"),
                });
            }
        }
        Ok(())
    }

    /// Whether `moment` falls inside the window.
    #[must_use]
    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| moment >= start) && self.end.is_none_or(|end| moment < end)
    }

    /// Whether the start of `date` (midnight UTC) falls inside the window.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.and_time(NaiveTime::MIN).and_utc())
    }

    fn condition<Col: ColumnTrait>(&self, column: Col) -> Condition {
        Condition::all()
            .add_option(self.start.map(|start| column.gte(start)))
            .add_option(self.end.map(|end| column.lt(end)))
    }
}

/// Income split by source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IncomeBreakdown {
    /// Monthly dues payments
    pub dues: f64,
    /// Paid fines, at their snapshot amounts
    pub fines: f64,
    /// Other contributions
    pub contributions: f64,
}

impl IncomeBreakdown {
    /// Income from all sources.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.dues + self.fines + self.contributions
    }
}

/// Expense total for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// Category ID
    pub category_id: i64,
    /// Category name
    pub name: String,
    /// Sum of the category's expenses in the window
    pub total: f64,
    /// Number of expenses in the window
    pub count: i64,
}

/// Income, expenses and balance over a window, with the per-category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStatement {
    /// Window the statement covers
    pub window: DateWindow,
    /// Income split by source
    pub income: IncomeBreakdown,
    /// Income from all sources
    pub total_income: f64,
    /// Sum of all expenses
    pub total_expenses: f64,
    /// Income minus expenses
    pub balance: f64,
    /// Expense totals per category, ordered by name
    pub categories: Vec<CategoryTotal>,
}

/// One month's figures next to the all-time balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// Month summarized
    pub period: YearMonth,
    /// The month's income split by source
    pub income: IncomeBreakdown,
    /// The month's income from all sources
    pub total_income: f64,
    /// The month's expenses
    pub total_expenses: f64,
    /// Month income minus month expenses
    pub difference: f64,
    /// All-time balance
    pub current_balance: f64,
}

async fn sum_amounts<E, C>(db: &C, amount: E::Column, filter: Condition) -> Result<f64>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let total: Option<Option<f64>> = E::find()
        .select_only()
        .column_as(Expr::col(amount).sum(), "total")
        .filter(filter)
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0.0))
}

async fn income_in<C>(db: &C, window: &DateWindow) -> Result<IncomeBreakdown>
where
    C: ConnectionTrait,
{
    let dues = sum_amounts::<DuesPayment, _>(
        db,
        dues_payment::Column::Amount,
        window.condition(dues_payment::Column::PaidAt),
    )
    .await?;

    let fines = sum_amounts::<Fine, _>(
        db,
        fine::Column::Amount,
        window
            .condition(fine::Column::PaidAt)
            .add(fine::Column::IsPaid.eq(true))
            .add(fine::Column::PaidAt.is_not_null()),
    )
    .await?;

    let contributions = sum_amounts::<Contribution, _>(
        db,
        contribution::Column::Amount,
        window.condition(contribution::Column::ContributedAt),
    )
    .await?;

    Ok(IncomeBreakdown {
        dues,
        fines,
        contributions,
    })
}

async fn expenses_in<C>(db: &C, window: &DateWindow) -> Result<f64>
where
    C: ConnectionTrait,
{
    sum_amounts::<Expense, _>(
        db,
        expense::Column::Amount,
        window.condition(expense::Column::SpentAt),
    )
    .await
}

/// Expense totals per category inside `window`, ordered by category name.
/// Categories without expenses are listed with a zero total.
pub async fn expenses_by_category<C>(db: &C, window: &DateWindow) -> Result<Vec<CategoryTotal>>
where
    C: ConnectionTrait,
{
    window.validate()?;

    let rows: Vec<(i64, Option<f64>, i64)> = Expense::find()
        .select_only()
        .column(expense::Column::CategoryId)
        .column_as(Expr::col(expense::Column::Amount).sum(), "total")
        .column_as(Expr::col(expense::Column::Id).count(), "count")
        .filter(window.condition(expense::Column::SpentAt))
        .group_by(expense::Column::CategoryId)
        .into_tuple()
        .all(db)
        .await?;

    let mut totals: HashMap<i64, (f64, i64)> = rows
        .into_iter()
        .map(|(category_id, total, count)| (category_id, (total.unwrap_or(0.0), count)))
        .collect();

    let categories = ExpenseCategory::find()
        .order_by_asc(expense_category::Column::Name)
        .all(db)
        .await?;

    Ok(categories
        .into_iter()
        .map(|category| {
            let (total, count) = totals.remove(&category.id).unwrap_or((0.0, 0));
            CategoryTotal {
                category_id: category.id,
                name: category.name,
                total,
                count,
            }
        })
        .collect())
}

/// Full statement for `window`.
pub async fn team_statement<C>(db: &C, window: &DateWindow) -> Result<TeamStatement>
where
    C: ConnectionTrait,
{
    window.validate()?;

    let income = income_in(db, window).await?;
    let total_expenses = expenses_in(db, window).await?;
    let categories = expenses_by_category(db, window).await?;
    let total_income = income.total();

    debug!(
        "Statement {:?}: income {:.2}, expenses {:.2}",
        window, total_income, total_expenses
    );

    Ok(TeamStatement {
        window: *window,
        income,
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
        categories,
    })
}

/// All-time income minus all-time expenses.
pub async fn current_balance<C>(db: &C) -> Result<f64>
where
    C: ConnectionTrait,
{
    let window = DateWindow::all_time();
    let income = income_in(db, &window).await?;
    let expenses = expenses_in(db, &window).await?;
    Ok(income.total() - expenses)
}

/// Income and expenses of one month, plus the all-time balance.
pub async fn monthly_summary<C>(db: &C, period: YearMonth) -> Result<MonthlySummary>
where
    C: ConnectionTrait,
{
    let window = DateWindow::month(period)?;
    let income = income_in(db, &window).await?;
    let total_expenses = expenses_in(db, &window).await?;
    let total_income = income.total();

    Ok(MonthlySummary {
        period,
        income,
        total_income,
        total_expenses,
        difference: total_income - total_expenses,
        current_balance: current_balance(db).await?,
    })
}
