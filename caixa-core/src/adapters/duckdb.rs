//! DuckDB repository implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountType, ClassificationData, HistoricalClassification, SettlementStatus,
    Transaction, TransactionKind,
};
use crate::ports::{AccountStore, TransactionStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const TRANSACTION_COLUMNS: &str = "transaction_id, account_id, transaction_date::VARCHAR, amount,
    description, kind, status, external_id, category_id, subcategory_id, payment_method_id,
    cost_center_id, created_at::VARCHAR";

const CLASSIFICATION_COLUMNS: &str = "description, account_id, created_at::VARCHAR, category_id,
    subcategory_id, payment_method_id, cost_center_id";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed ledger
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the ledger database at `db_path`
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Connection::open(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            "database busy, retrying: {err_msg}"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error
            .map(Into::into)
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Throwaway in-memory database
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run pending migrations
    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure the schema exists and is current
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "applied ledger migrations");
        }
        Ok(())
    }

    pub fn get_transaction_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Transactions of one account, newest date first
    pub fn get_transactions_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM sys_transactions
             WHERE account_id = ?
             ORDER BY transaction_date DESC, created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([account_id.to_string()], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl TransactionStore for DuckDbRepository {
    async fn find_latest_classified(
        &self,
        description: &str,
        account_id: Uuid,
    ) -> Result<Option<HistoricalClassification>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {CLASSIFICATION_COLUMNS} FROM sys_transactions
             WHERE description = ? AND account_id = ?
               AND category_id IS NOT NULL AND payment_method_id IS NOT NULL
             ORDER BY created_at DESC
             LIMIT 1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(
            params![description, account_id.to_string()],
            row_to_classification,
        )?;
        match rows.next() {
            Some(row) => Ok(row?),
            None => Ok(None),
        }
    }

    async fn find_classified_by_descriptions(
        &self,
        descriptions: &[String],
    ) -> Result<Vec<HistoricalClassification>> {
        if descriptions.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let placeholders = vec!["?"; descriptions.len()].join(", ");
        let sql = format!(
            "SELECT {CLASSIFICATION_COLUMNS} FROM sys_transactions
             WHERE description IN ({placeholders})
               AND category_id IS NOT NULL AND payment_method_id IS NOT NULL
             ORDER BY created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(descriptions.iter()), row_to_classification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().flatten().collect())
    }

    async fn find_existing_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<HashSet<String>> {
        if external_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let conn = self.conn()?;
        let placeholders = vec!["?"; external_ids.len()].join(", ");
        let sql = format!(
            "SELECT DISTINCT external_id FROM sys_transactions WHERE external_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(external_ids.iter()), |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    async fn insert(&self, tx: &Transaction) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_transactions (transaction_id, account_id, transaction_date, amount,
                                           description, kind, status, external_id, category_id,
                                           subcategory_id, payment_method_id, cost_center_id,
                                           created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                tx.id.to_string(),
                tx.account_id.to_string(),
                tx.date.to_string(),
                tx.amount.to_f64().unwrap_or(0.0),
                tx.description,
                tx.kind.as_str(),
                tx.status.as_str(),
                tx.external_id,
                tx.category_id.map(|id| id.to_string()),
                tx.subcategory_id.map(|id| id.to_string()),
                tx.payment_method_id.map(|id| id.to_string()),
                tx.cost_center_id.map(|id| id.to_string()),
                tx.created_at.naive_utc().format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for DuckDbRepository {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT account_id, name, account_type, created_at::VARCHAR
             FROM sys_accounts WHERE account_id = ?",
        )?;
        let mut rows = stmt.query_map([id.to_string()], row_to_account)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT account_id, name, account_type, created_at::VARCHAR
             FROM sys_accounts ORDER BY name",
        )?;
        let accounts = stmt
            .query_map([], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_accounts (account_id, name, account_type, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.name,
                account.account_type.as_str(),
                account.created_at.naive_utc().format(TIMESTAMP_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }
}

// Row mapping

fn row_to_account(row: &duckdb::Row) -> duckdb::Result<Account> {
    let id_str: String = row.get(0)?;
    let account_type: String = row.get(2)?;
    let created_str: String = row.get(3)?;
    Ok(Account {
        id: parse_uuid(&id_str),
        name: row.get(1)?,
        account_type: AccountType::from(account_type),
        created_at: parse_timestamp(&created_str),
    })
}

fn row_to_transaction(row: &duckdb::Row) -> duckdb::Result<Transaction> {
    // 0: transaction_id, 1: account_id, 2: transaction_date, 3: amount, 4: description,
    // 5: kind, 6: status, 7: external_id, 8: category_id, 9: subcategory_id,
    // 10: payment_method_id, 11: cost_center_id, 12: created_at
    let id_str: String = row.get(0)?;
    let account_id_str: String = row.get(1)?;
    let date_str: String = row.get(2)?;
    let amount: f64 = row.get(3)?;
    let kind: String = row.get(5)?;
    let status: String = row.get(6)?;
    let created_str: String = row.get(12)?;

    Ok(Transaction {
        id: parse_uuid(&id_str),
        account_id: parse_uuid(&account_id_str),
        date: parse_date(&date_str),
        amount: Decimal::try_from(amount).unwrap_or_default().round_dp(2),
        description: row.get(4)?,
        kind: TransactionKind::parse(&kind).unwrap_or(TransactionKind::Despesa),
        status: SettlementStatus::parse(&status).unwrap_or(SettlementStatus::Realizado),
        external_id: row.get(7)?,
        category_id: parse_optional_uuid(row.get(8)?),
        subcategory_id: parse_optional_uuid(row.get(9)?),
        payment_method_id: parse_optional_uuid(row.get(10)?),
        cost_center_id: parse_optional_uuid(row.get(11)?),
        created_at: parse_timestamp(&created_str),
    })
}

/// Map a classification row; rows with unparseable ids map to `None`
fn row_to_classification(row: &duckdb::Row) -> duckdb::Result<Option<HistoricalClassification>> {
    // 0: description, 1: account_id, 2: created_at, 3: category_id,
    // 4: subcategory_id, 5: payment_method_id, 6: cost_center_id
    let account_id_str: String = row.get(1)?;
    let created_str: String = row.get(2)?;
    let category_id = parse_optional_uuid(row.get(3)?);
    let payment_method_id = parse_optional_uuid(row.get(5)?);

    let (Some(category_id), Some(payment_method_id), Ok(account_id)) = (
        category_id,
        payment_method_id,
        Uuid::parse_str(&account_id_str),
    ) else {
        return Ok(None);
    };

    Ok(Some(HistoricalClassification {
        description: row.get(0)?,
        account_id,
        created_at: parse_timestamp(&created_str),
        classification: ClassificationData {
            category_id,
            subcategory_id: parse_optional_uuid(row.get(4)?),
            payment_method_id,
            cost_center_id: parse_optional_uuid(row.get(6)?),
        },
    }))
}

// Helper functions

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_optional_uuid(s: Option<String>) -> Option<Uuid> {
    s.and_then(|s| Uuid::parse_str(&s).ok())
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}

/// Parse a DuckDB TIMESTAMP rendered as VARCHAR (always UTC here)
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn repo_with_account() -> (DuckDbRepository, Account) {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let account = Account::new(Uuid::new_v4(), "Itaú", AccountType::ContaCorrente);
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(repo.insert_account(&account)).unwrap();
        (repo, account)
    }

    fn classified(account_id: Uuid, description: &str, created_at: DateTime<Utc>) -> Transaction {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            account_id,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            Decimal::new(2599, 2),
            description,
            TransactionKind::Despesa,
        );
        tx.apply_classification(&ClassificationData {
            category_id: Uuid::new_v4(),
            subcategory_id: None,
            payment_method_id: Uuid::new_v4(),
            cost_center_id: Some(Uuid::new_v4()),
        });
        tx.created_at = created_at;
        tx
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let ts = parse_timestamp("2025-01-15 10:30:00.123456");
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-01-15 10:30:00");
        let ts = parse_timestamp("2025-01-15 10:30:00");
        assert_eq!(ts.format("%H:%M").to_string(), "10:30");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: database is locked"));
        assert!(!is_retryable_error("Catalog Error: table does not exist"));
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let account = Account::new(Uuid::new_v4(), "Inter", AccountType::CarteiraDigital);
        repo.insert_account(&account).await.unwrap();

        let mut tx = classified(account.id, "SUPERMERCADO", Utc::now());
        tx.external_id = Some("ext-1".to_string());
        repo.insert(&tx).await.unwrap();

        let stored = repo.get_transactions_by_account(account.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].amount, Decimal::new(2599, 2));
        assert_eq!(stored[0].external_id.as_deref(), Some("ext-1"));
        assert_eq!(stored[0].classification(), tx.classification());

        let fetched = repo.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(fetched.account_type, AccountType::CarteiraDigital);
    }

    #[test]
    fn test_classification_lookups_are_newest_first() {
        let (repo, account) = repo_with_account();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let now = Utc::now();
        let older = classified(account.id, "NETFLIX", now - Duration::days(30));
        let newer = classified(account.id, "NETFLIX", now - Duration::days(1));
        let mut unclassified = classified(account.id, "NETFLIX", now);
        unclassified.payment_method_id = None;

        rt.block_on(async {
            repo.insert(&older).await.unwrap();
            repo.insert(&newer).await.unwrap();
            repo.insert(&unclassified).await.unwrap();

            let latest = repo
                .find_latest_classified("NETFLIX", account.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(Some(latest.classification), newer.classification());

            let rows = repo
                .find_classified_by_descriptions(&["NETFLIX".to_string()])
                .await
                .unwrap();
            assert_eq!(rows.len(), 2);
            assert!(rows[0].created_at > rows[1].created_at);

            assert!(repo
                .find_latest_classified("NETFLIX", Uuid::new_v4())
                .await
                .unwrap()
                .is_none());
        });
    }

    #[tokio::test]
    async fn test_existing_external_ids() {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let account = Account::new(Uuid::new_v4(), "C6", AccountType::ContaCorrente);
        repo.insert_account(&account).await.unwrap();

        let mut tx = classified(account.id, "PIX", Utc::now());
        tx.external_id = Some("abc-123".to_string());
        repo.insert(&tx).await.unwrap();

        let found = repo
            .find_existing_external_ids(&["abc-123".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(found, HashSet::from(["abc-123".to_string()]));
        assert!(repo.find_existing_external_ids(&[]).await.unwrap().is_empty());
    }
}
