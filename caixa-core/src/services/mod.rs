//! Service layer - the import pipeline and its supporting services
//!
//! Each pipeline stage is its own service so it can be exercised alone;
//! `ImportService` wires them together.

mod accounts;
pub mod classifier;
pub mod csv_parser;
pub mod duplicates;
pub mod import;
pub mod importer;
pub mod logging;
pub mod mapper;
pub mod migration;
mod status;

pub use accounts::AccountService;
pub use classifier::LineageClassifier;
pub use csv_parser::{parse_csv, CsvRow, ParseProfile, ParsedCsv};
pub use duplicates::{DuplicateCheck, DuplicateValidator};
pub use import::{resolve_template, ImportOptions, ImportReport, ImportService};
pub use importer::{ImportResult, Importer, RowOutcome};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use mapper::{map_rows, parse_amount, MappingOutcome, SkippedRow};
pub use migration::{MigrationResult, MigrationService};
pub use status::annotate_statuses;
