//! Import service - bank statement import pipeline
//!
//! parse → map → annotate status → classify → drop duplicates → import.
//! Nothing is persisted before the duplicate check succeeds.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, BankTemplate, ImportedTransaction};
use crate::ports::{AccountStore, TransactionStore};
use crate::services::classifier::LineageClassifier;
use crate::services::csv_parser::parse_csv;
use crate::services::duplicates::DuplicateValidator;
use crate::services::importer::{ImportResult, Importer};
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::mapper::{map_rows, MappingOutcome, SkippedRow};
use crate::services::status::annotate_statuses;
use crate::templates::get_template;

/// Options for one import run
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Run every stage except persistence
    pub preview: bool,
    /// Suggest classifications from history
    pub classify: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            preview: false,
            classify: true,
        }
    }
}

/// Outcome of an import run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub result: ImportResult,
    pub skipped_rows: Vec<SkippedRow>,
    pub preview: bool,
    /// Candidates that would be imported (preview only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<ImportedTransaction>>,
    pub template_id: String,
    pub used_fallback: bool,
}

pub struct ImportService {
    accounts: Arc<dyn AccountStore>,
    classifier: LineageClassifier,
    duplicates: DuplicateValidator,
    importer: Importer,
    logger: Option<Arc<LoggingService>>,
}

impl ImportService {
    pub fn new(transactions: Arc<dyn TransactionStore>, accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            accounts,
            classifier: LineageClassifier::new(Arc::clone(&transactions)),
            duplicates: DuplicateValidator::new(Arc::clone(&transactions)),
            importer: Importer::new(transactions),
            logger: None,
        }
    }

    /// Record import outcomes in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Import a statement file
    pub async fn import_file(
        &self,
        path: &Path,
        template_id: &str,
        account_id: Uuid,
        options: ImportOptions,
    ) -> Result<ImportReport> {
        let bytes = std::fs::read(path)?;
        self.import_bytes(&bytes, template_id, account_id, options)
            .await
    }

    /// Import statement contents
    pub async fn import_bytes(
        &self,
        bytes: &[u8],
        template_id: &str,
        account_id: Uuid,
        options: ImportOptions,
    ) -> Result<ImportReport> {
        let outcome = self.run(bytes, template_id, account_id, options).await;

        let event = match &outcome {
            Ok(report) if report.preview => None,
            Ok(report) => Some(
                LogEvent::new("import_completed")
                    .with_template(template_id)
                    .with_counts(&report.result),
            ),
            Err(e) => Some(
                LogEvent::new("import_failed")
                    .with_template(template_id)
                    .with_error(e.to_string()),
            ),
        };
        if let (Some(logger), Some(event)) = (&self.logger, event) {
            if let Err(e) = logger.log(event) {
                tracing::warn!(error = %e, "failed to record import event");
            }
        }

        outcome
    }

    async fn run(
        &self,
        bytes: &[u8],
        template_id: &str,
        account_id: Uuid,
        options: ImportOptions,
    ) -> Result<ImportReport> {
        let template = resolve_template(template_id)?;
        let account = self
            .accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Conta {account_id}")))?;

        let parsed = parse_csv(bytes, Some(template))?;
        let used_fallback = parsed.profile.used_fallback;
        let MappingOutcome {
            transactions,
            skipped,
        } = map_rows(&parsed, template, account.id);

        tracing::info!(
            template = template.id,
            rows = parsed.rows.len(),
            candidates = transactions.len(),
            skipped = skipped.len(),
            used_fallback,
            "statement parsed"
        );

        let candidates = self.prepare(transactions, &account, options).await;
        let check = self.duplicates.check(candidates).await?;
        let duplicated = check.duplicates.len();

        let report = move |result: ImportResult, candidates: Option<Vec<ImportedTransaction>>| {
            ImportReport {
                result,
                skipped_rows: skipped,
                preview: options.preview,
                candidates,
                template_id: template.id.to_string(),
                used_fallback,
            }
        };

        if options.preview {
            let result = ImportResult {
                total: check.new.len(),
                duplicated,
                ..ImportResult::default()
            };
            return Ok(report(result, Some(check.new)));
        }

        if check.new.is_empty() {
            tracing::info!(duplicated, "nothing new to import");
            return Ok(report(
                ImportResult {
                    duplicated,
                    ..ImportResult::default()
                },
                None,
            ));
        }

        let mut result = self.importer.import_all(&check.new).await?;
        result.duplicated = duplicated;

        tracing::info!(
            template = template.id,
            total = result.total,
            imported = result.imported,
            duplicated = result.duplicated,
            failed = result.failed(),
            "import finished"
        );

        Ok(report(result, None))
    }

    /// Status annotation and, when enabled, classification
    async fn prepare(
        &self,
        candidates: Vec<ImportedTransaction>,
        account: &Account,
        options: ImportOptions,
    ) -> Vec<ImportedTransaction> {
        let annotated = annotate_statuses(&candidates, std::slice::from_ref(account));
        if options.classify {
            self.classifier.enrich(&annotated).await
        } else {
            annotated
        }
    }
}

/// Resolve a template id given on the command line or in settings
pub fn resolve_template(template_id: &str) -> Result<&'static BankTemplate> {
    get_template(template_id).ok_or_else(|| Error::not_found(format!("Template {template_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::{AccountType, SettlementStatus};

    const NUBANK_CSV: &str = "Data,Valor,Identificador,Descrição\n\
        01/04/2025,-89.90,nu-1,Mercado\n\
        02/04/2025,1500.00,nu-2,Salário\n";

    fn setup(account_type: AccountType) -> (Arc<InMemoryStore>, Account, ImportService) {
        let account = Account::new(Uuid::new_v4(), "Conta", account_type);
        let store = Arc::new(InMemoryStore::with_accounts([account.clone()]));
        let service = ImportService::new(store.clone(), store.clone());
        (store, account, service)
    }

    #[tokio::test]
    async fn test_import_persists_new_rows() {
        let (store, account, service) = setup(AccountType::ContaCorrente);

        let report = service
            .import_bytes(NUBANK_CSV.as_bytes(), "nubank", account.id, ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(report.result.total, 2);
        assert_eq!(report.result.imported, 2);
        assert!(report.candidates.is_none());
        assert_eq!(store.transactions().len(), 2);
    }

    #[tokio::test]
    async fn test_preview_persists_nothing() {
        let (store, account, service) = setup(AccountType::CartaoCredito);

        let report = service
            .import_bytes(
                NUBANK_CSV.as_bytes(),
                "nubank",
                account.id,
                ImportOptions {
                    preview: true,
                    classify: true,
                },
            )
            .await
            .unwrap();

        assert!(report.preview);
        let candidates = report.candidates.unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates
            .iter()
            .all(|c| c.status == Some(SettlementStatus::Previsto)));
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_reimport_only_counts_duplicates() {
        let (store, account, service) = setup(AccountType::ContaCorrente);
        service
            .import_bytes(NUBANK_CSV.as_bytes(), "nubank", account.id, ImportOptions::default())
            .await
            .unwrap();

        let report = service
            .import_bytes(NUBANK_CSV.as_bytes(), "nubank", account.id, ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(report.result.imported, 0);
        assert_eq!(report.result.duplicated, 2);
        assert_eq!(store.transactions().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_template_and_account() {
        let (_, account, service) = setup(AccountType::ContaCorrente);

        let err = service
            .import_bytes(b"", "banco-x", account.id, ImportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = service
            .import_bytes(NUBANK_CSV.as_bytes(), "nubank", Uuid::new_v4(), ImportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_check_failure_aborts_before_any_insert() {
        let (store, account, service) = setup(AccountType::ContaCorrente);
        store.fail_external_id_lookups(true);

        let err = service
            .import_bytes(NUBANK_CSV.as_bytes(), "nubank", account.id, ImportOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateCheck(_)));
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            LoggingService::new(dir.path(), crate::services::EntryPoint::Library, "test").unwrap(),
        );
        let (_, account, service) = setup(AccountType::ContaCorrente);
        let service = service.with_logger(logger.clone());

        service
            .import_bytes(NUBANK_CSV.as_bytes(), "nubank", account.id, ImportOptions::default())
            .await
            .unwrap();
        let _ = service
            .import_bytes(b"", "banco-x", account.id, ImportOptions::default())
            .await;

        let entries = logger.get_recent(10).unwrap();
        let events: Vec<_> = entries.iter().map(|e| e.event.as_str()).collect();
        assert!(events.contains(&"import_completed"));
        assert!(events.contains(&"import_failed"));
        let completed = entries.iter().find(|e| e.event == "import_completed").unwrap();
        assert_eq!(completed.imported, Some(2));
    }
}
