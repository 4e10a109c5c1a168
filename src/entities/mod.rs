//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod contribution;
pub mod dues_payment;
pub mod expense;
pub mod expense_category;
pub mod fine;
pub mod fine_cause;
pub mod player;
pub mod setting;

// Re-export specific types to avoid conflicts
pub use contribution::{
    Column as ContributionColumn, Entity as Contribution, Model as ContributionModel,
};
pub use dues_payment::{
    Column as DuesPaymentColumn, Entity as DuesPayment, Model as DuesPaymentModel,
};
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use expense_category::{
    Column as ExpenseCategoryColumn, Entity as ExpenseCategory, Model as ExpenseCategoryModel,
};
pub use fine::{Column as FineColumn, Entity as Fine, Model as FineModel};
pub use fine_cause::{Column as FineCauseColumn, Entity as FineCause, Model as FineCauseModel};
pub use player::{Column as PlayerColumn, Entity as Player, Model as PlayerModel, Position};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
