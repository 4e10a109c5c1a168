//! Framework-agnostic business logic.
//!
//! Each module works directly on a SeaORM connection. Functions generic over
//! `ConnectionTrait` can also run inside a caller's transaction.

pub mod dues;
pub mod expenses;
pub mod finance;
pub mod fines;
pub mod group;
pub mod payments;
pub mod period;
pub mod players;
pub mod report;
pub mod settings;
pub mod status;
