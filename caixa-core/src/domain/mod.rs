//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod result;
pub mod status;
mod template;
mod transaction;

pub use account::{Account, AccountType};
pub use status::{
    detect_default_status, status_color, status_description, status_icon,
    AccountWithDefaultStatus, SettlementStatus,
};
pub use template::{BankTemplate, ColumnMapping, DecimalMark, KindColumn, TextEncoding};
pub use transaction::{
    ClassificationData, ClassificationKey, HistoricalClassification, ImportedTransaction,
    Transaction, TransactionKind,
};
