//! Unified error type for the club treasury.
//!
//! Every business-rule violation has its own variant so callers can match on
//! it directly; [`Error::kind`] folds them into the coarse categories a
//! presentation layer needs (not found, conflict, missing configuration,
//! validation, internal).

use sea_orm::DbErr;
use thiserror::Error;

/// Coarse classification of an [`Error`] for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced record does not exist.
    NotFound,
    /// The request collides with existing state (duplicates, references in use).
    Conflict,
    /// Required global configuration is absent.
    ConfigurationMissing,
    /// Malformed or out-of-range input, rejected before any write.
    Validation,
    /// Storage or configuration-file failures.
    Internal,
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Player not found: {national_id}")]
    PlayerNotFound { national_id: String },

    #[error("Fine not found: {fine_id}")]
    FineNotFound { fine_id: i64 },

    #[error("Fine cause not found: {cause_id}")]
    FineCauseNotFound { cause_id: i64 },

    #[error("Group contribution not found: {group_id}")]
    GroupContributionNotFound { group_id: String },

    #[error("Expense category not found: {category_id}")]
    ExpenseCategoryNotFound { category_id: i64 },

    #[error("Expense not found: {expense_id}")]
    ExpenseNotFound { expense_id: i64 },

    #[error("Setting not found: {key}")]
    SettingNotFound { key: String },

    #[error("Player already registered: {national_id}")]
    PlayerAlreadyExists { national_id: String },

    #[error("Registration alias already in use: {alias}")]
    AliasInUse { alias: String },

    #[error("Monthly dues for {month:02}/{year} are already paid")]
    DuesAlreadyPaid { month: u32, year: i32 },

    #[error("A {entity} named '{name}' already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("Cannot delete {entity} '{name}': referenced by {references} record(s)")]
    InUse {
        entity: &'static str,
        name: String,
        references: u64,
    },

    #[error("Fine {fine_id} cannot be paid: it does not belong to the player or is already paid")]
    FineNotPayable { fine_id: i64 },

    #[error("Required setting '{key}' is not configured")]
    MissingSetting { key: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Invalid period: month {month}, year {year}")]
    InvalidPeriod { month: u32, year: i32 },

    #[error("Invalid date: {message}")]
    InvalidDate { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },
}

impl Error {
    /// Classifies the error for callers that only care about the category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PlayerNotFound { .. }
            | Self::FineNotFound { .. }
            | Self::FineCauseNotFound { .. }
            | Self::GroupContributionNotFound { .. }
            | Self::ExpenseCategoryNotFound { .. }
            | Self::ExpenseNotFound { .. }
            | Self::SettingNotFound { .. } => ErrorKind::NotFound,
            Self::PlayerAlreadyExists { .. }
            | Self::AliasInUse { .. }
            | Self::DuesAlreadyPaid { .. }
            | Self::DuplicateName { .. }
            | Self::InUse { .. }
            | Self::FineNotPayable { .. } => ErrorKind::Conflict,
            Self::MissingSetting { .. } => ErrorKind::ConfigurationMissing,
            Self::InvalidAmount { .. }
            | Self::InvalidPeriod { .. }
            | Self::InvalidDate { .. }
            | Self::Validation { .. } => ErrorKind::Validation,
            Self::Database(_) | Self::Config { .. } => ErrorKind::Internal,
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
