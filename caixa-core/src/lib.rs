//! Caixa Core - bank statement import and classification
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, ImportedTransaction, BankTemplate, ...)
//! - **ports**: Store traits the services depend on
//! - **services**: The import pipeline (parse, map, status, classify, dedup, import)
//! - **adapters**: Concrete stores (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;
pub mod templates;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::{AccountService, ImportService, LoggingService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    Account, AccountType, AccountWithDefaultStatus, BankTemplate, ClassificationData,
    ImportedTransaction, SettlementStatus, Transaction, TransactionKind,
};
pub use services::{ImportOptions, ImportReport, ImportResult};

const DB_FILENAME: &str = "caixa.duckdb";

/// Main context for Caixa operations
///
/// Holds the ledger connection, configuration and the services built on
/// top of them.
pub struct CaixaContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub account_service: AccountService,
}

impl CaixaContext {
    /// Open the ledger in `data_dir`, creating the directory and schema
    pub fn new(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir, None)
    }

    /// Like [`CaixaContext::new`], recording import outcomes in the event log
    pub fn with_logger(data_dir: &Path, logger: Arc<LoggingService>) -> Result<Self> {
        Self::open(data_dir, Some(logger))
    }

    fn open(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        let mut import_service = ImportService::new(repository.clone(), repository.clone());
        if let Some(logger) = logger {
            import_service = import_service.with_logger(logger);
        }
        let account_service = AccountService::new(repository.clone());

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            repository,
            import_service,
            account_service,
        })
    }
}
