//! Adapter implementations
//!
//! Adapters implement the store ports with concrete technologies:
//! - DuckDB for the persistent ledger
//! - Plain vectors for tests and database-free runs

pub mod duckdb;
pub mod memory;
