//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod account_store;
mod transaction_store;

pub use account_store::AccountStore;
pub use transaction_store::TransactionStore;
