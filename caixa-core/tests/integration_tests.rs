//! Integration tests for caixa-core services
//!
//! These run the whole import pipeline against a real DuckDB file.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use caixa_core::adapters::duckdb::DuckDbRepository;
use caixa_core::domain::{ClassificationData, ClassificationKey};
use caixa_core::ports::{AccountStore, TransactionStore};
use caixa_core::services::{
    parse_csv, EntryPoint, ImportService, Importer, LineageClassifier, LoggingService,
};
use caixa_core::templates::get_template;
use caixa_core::{
    Account, AccountType, CaixaContext, Error, ImportOptions, ImportedTransaction,
    SettlementStatus, Transaction, TransactionKind,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a test repository with schema initialized
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

async fn create_account(repo: &DuckDbRepository, account_type: AccountType) -> Account {
    let account = Account::new(Uuid::new_v4(), "Conta de teste", account_type);
    repo.insert_account(&account).await.expect("Failed to insert account");
    account
}

/// Encode text as ISO-8859-1, the way most bank exports arrive
fn latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u8).collect()
}

fn candidate(account_id: Uuid, description: &str, cents: i64, external_id: &str) -> ImportedTransaction {
    ImportedTransaction::new(
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        Decimal::new(cents, 2),
        description,
        account_id,
        TransactionKind::Despesa,
    )
    .with_external_id(external_id)
}

fn classified_history(
    account_id: Uuid,
    description: &str,
    age_days: i64,
) -> (Transaction, ClassificationData) {
    let classification = ClassificationData {
        category_id: Uuid::new_v4(),
        subcategory_id: None,
        payment_method_id: Uuid::new_v4(),
        cost_center_id: Some(Uuid::new_v4()),
    };
    let mut tx = Transaction::new(
        Uuid::new_v4(),
        account_id,
        NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
        Decimal::new(3990, 2),
        description,
        TransactionKind::Despesa,
    );
    tx.apply_classification(&classification);
    tx.created_at = Utc::now() - Duration::days(age_days);
    (tx, classification)
}

// ============================================================================
// End-to-end Scenarios
// ============================================================================

/// Three rows with unseen external ids are all imported
#[tokio::test]
async fn test_import_three_unique_rows() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let account = create_account(&repo, AccountType::ContaCorrente).await;

    let importer = Importer::new(repo.clone());
    let result = importer
        .import_all(&[
            candidate(account.id, "MERCADO", 12050, "e2e-1"),
            candidate(account.id, "FARMÁCIA", 3890, "e2e-2"),
            candidate(account.id, "POSTO", 20000, "e2e-3"),
        ])
        .await
        .unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.imported, 3);
    assert!(result.errors.is_empty());
    assert_eq!(repo.get_transaction_count().unwrap(), 3);
}

/// A row with an empty description fails alone
#[tokio::test]
async fn test_import_with_empty_description() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let account = create_account(&repo, AccountType::ContaCorrente).await;

    let importer = Importer::new(repo.clone());
    let result = importer
        .import_all(&[
            candidate(account.id, "", 1000, "e2e-4"),
            candidate(account.id, "PADARIA", 1500, "e2e-5"),
        ])
        .await
        .unwrap();

    assert_eq!(result.imported, 1);
    assert_eq!(result.errors, vec!["Linha 1 (...): Descrição é obrigatória".to_string()]);
}

/// Preamble lines are dropped before the header
#[test]
fn test_parse_skips_preamble() {
    let santander = get_template("santander").unwrap();
    assert_eq!(santander.skip_lines, 2);

    let csv = "EXTRATO DE CONTA CORRENTE\n\
               AGENCIA 0001 CONTA 01234567-8\n\
               Data;Histórico;Documento;Valor (R$);Saldo (R$)\n\
               03/03/2025;PIX RECEBIDO;000111;250,00;1.250,00\n\
               04/03/2025;PAGAMENTO BOLETO;000112;-80,00;1.170,00\n";
    let parsed = parse_csv(&latin1(csv), Some(santander)).unwrap();

    assert!(!parsed.profile.used_fallback);
    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[0].get("Histórico"), Some("PIX RECEBIDO"));
    assert!(parsed
        .rows
        .iter()
        .all(|row| row.get("Data") != Some("EXTRATO DE CONTA CORRENTE")));
}

/// A wrong delimiter falls back to a generic parse; only a double failure rejects
#[test]
fn test_parse_falls_back_then_rejects() {
    let c6 = get_template("c6").unwrap();

    let comma_file = "Data,Descrição,Valor,Tipo,ID\n10/03/2025,UBER,\"23,90\",Saída,c6-1\n";
    let parsed = parse_csv(comma_file.as_bytes(), Some(c6)).unwrap();
    assert!(parsed.profile.used_fallback);
    assert_eq!(parsed.rows.len(), 1);
    assert_eq!(parsed.rows[0].get("Descrição"), Some("UBER"));

    let broken = "Data;Descrição\n10/03/2025;UBER;23,90;extra\n";
    let err = parse_csv(broken.as_bytes(), Some(c6)).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

/// A UTF-8 export imported under a Latin-1 template with a preamble still lands intact
#[tokio::test]
async fn test_fallback_import_keeps_text_and_rows() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let account = create_account(&repo, AccountType::ContaCorrente).await;
    let service = ImportService::new(repo.clone(), repo.clone());

    let csv = "Data,Descrição,Valor\n\
               05/03/2025,Café,-7.90\n\
               06/03/2025,Pão,-4.50\n\
               07/03/2025,Açougue,-32.00\n";
    let report = service
        .import_bytes(csv.as_bytes(), "santander", account.id, ImportOptions::default())
        .await
        .unwrap();

    assert!(report.used_fallback);
    assert!(report.skipped_rows.is_empty());
    assert_eq!(report.result.imported, 3);

    let stored = repo.get_transactions_by_account(account.id).unwrap();
    let coffee = stored.iter().find(|t| t.description == "Café").unwrap();
    assert_eq!(coffee.amount, Decimal::new(790, 2));
    assert!(stored.iter().any(|t| t.description == "Açougue"));
}

// ============================================================================
// Full pipeline against DuckDB
// ============================================================================

#[tokio::test]
async fn test_file_import_through_context() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = CaixaContext::new(temp_dir.path()).unwrap();
    let account = ctx
        .account_service
        .create_account("Itaú", AccountType::ContaCorrente)
        .await
        .unwrap();

    let bytes = latin1("data;lançamento;valor\n01/03/2025;SUPERMERCADO;-150,35\n02/03/2025;SALÁRIO;5.000,00\n");
    let path = temp_dir.path().join("extrato.csv");
    std::fs::write(&path, bytes).unwrap();

    let report = ctx
        .import_service
        .import_file(&path, "itau", account.id, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.result.imported, 2);
    let stored = ctx.repository.get_transactions_by_account(account.id).unwrap();
    assert_eq!(stored.len(), 2);
    let salary = stored.iter().find(|t| t.description == "SALÁRIO").unwrap();
    assert_eq!(salary.amount, Decimal::new(500000, 2));
    assert_eq!(salary.kind, TransactionKind::Receita);
    assert_eq!(salary.status, SettlementStatus::Realizado);
}

/// Re-importing the same statement only reports duplicates
#[tokio::test]
async fn test_reimport_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let account = create_account(&repo, AccountType::CarteiraDigital).await;
    let service = ImportService::new(repo.clone(), repo.clone());

    let csv = "Data,Valor,Identificador,Descrição\n\
               05/05/2025,-19.90,n-1,Streaming\n\
               06/05/2025,-7.50,n-2,Café\n";

    let first = service
        .import_bytes(csv.as_bytes(), "nubank", account.id, ImportOptions::default())
        .await
        .unwrap();
    let second = service
        .import_bytes(csv.as_bytes(), "nubank", account.id, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(first.result.imported, 2);
    assert_eq!(second.result.imported, 0);
    assert_eq!(second.result.duplicated, 2);
    assert_eq!(repo.get_transaction_count().unwrap(), 2);
}

/// Credit card candidates preview as previsto but are persisted as realizado
#[tokio::test]
async fn test_credit_card_status_is_pinned_to_realizado_on_import() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let account = create_account(&repo, AccountType::CartaoCredito).await;
    let service = ImportService::new(repo.clone(), repo.clone());
    let csv = "date,title,amount\n2025-05-10,Livraria,89.00\n";

    let preview = service
        .import_bytes(
            csv.as_bytes(),
            "nubank-cartao",
            account.id,
            ImportOptions {
                preview: true,
                classify: false,
            },
        )
        .await
        .unwrap();
    let candidates = preview.candidates.unwrap();
    assert_eq!(candidates[0].status, Some(SettlementStatus::Previsto));
    assert_eq!(repo.get_transaction_count().unwrap(), 0);

    service
        .import_bytes(csv.as_bytes(), "nubank-cartao", account.id, ImportOptions::default())
        .await
        .unwrap();
    let stored = repo.get_transactions_by_account(account.id).unwrap();
    assert_eq!(stored[0].status, SettlementStatus::Realizado);
}

/// Imported rows inherit the newest matching classification
#[tokio::test]
async fn test_classification_flows_into_persisted_rows() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let account = create_account(&repo, AccountType::ContaCorrente).await;

    let (old, _) = classified_history(account.id, "ACADEMIA", 90);
    let (recent, expected) = classified_history(account.id, "ACADEMIA", 3);
    repo.insert(&old).await.unwrap();
    repo.insert(&recent).await.unwrap();

    let classifier = LineageClassifier::new(repo.clone());
    let batch = classifier
        .classify_batch(&[("ACADEMIA".to_string(), account.id)])
        .await;
    assert_eq!(
        batch.get(&ClassificationKey::new("ACADEMIA", account.id)),
        Some(&expected)
    );

    let service = ImportService::new(repo.clone(), repo.clone());
    let csv = "Data,Descrição,Valor\n07/05/2025,ACADEMIA,-120.00\n";
    service
        .import_bytes(csv.as_bytes(), "generico", account.id, ImportOptions::default())
        .await
        .unwrap();

    let stored = repo.get_transactions_by_account(account.id).unwrap();
    let imported = stored
        .iter()
        .find(|t| t.date == NaiveDate::from_ymd_opt(2025, 5, 7).unwrap())
        .unwrap();
    assert_eq!(imported.classification(), Some(expected));
}

#[tokio::test]
async fn test_failed_import_is_logged_without_contents() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let account = create_account(&repo, AccountType::ContaCorrente).await;
    let logger = Arc::new(LoggingService::new(temp_dir.path(), EntryPoint::Library, "test").unwrap());
    let service = ImportService::new(repo.clone(), repo.clone()).with_logger(logger.clone());

    let err = service
        .import_bytes(b"a,b\n1,2,3\n", "nubank", account.id, ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));

    let errors = logger.get_errors(10).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].event, "import_failed");
    assert_eq!(errors[0].template_id.as_deref(), Some("nubank"));
    assert_eq!(repo.get_transaction_count().unwrap(), 0);
}
