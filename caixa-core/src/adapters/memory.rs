//! In-memory store implementation
//!
//! Implements both store ports over plain vectors. Used by tests and by
//! anything that wants to run the pipeline without a database. Failures can
//! be injected per operation to exercise the pipeline's error strategies.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, HistoricalClassification, Transaction};
use crate::ports::{AccountStore, TransactionStore};

#[derive(Default)]
pub struct InMemoryStore {
    accounts: Mutex<Vec<Account>>,
    transactions: Mutex<Vec<Transaction>>,
    fail_classification: AtomicBool,
    fail_external_ids: AtomicBool,
    fail_insert_description: Mutex<Option<String>>,
    external_id_queries: AtomicUsize,
    classification_queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        store.lock_accounts().extend(accounts);
        store
    }

    /// Seed an already persisted transaction
    pub fn seed(&self, tx: Transaction) {
        self.lock_transactions().push(tx);
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock_transactions().clone()
    }

    /// Make classification lookups fail
    pub fn fail_classification_lookups(&self, fail: bool) {
        self.fail_classification.store(fail, Ordering::SeqCst);
    }

    /// Make external id lookups fail
    pub fn fail_external_id_lookups(&self, fail: bool) {
        self.fail_external_ids.store(fail, Ordering::SeqCst);
    }

    /// Make inserts of transactions with this exact description fail
    pub fn fail_inserts_for(&self, description: impl Into<String>) {
        *self
            .fail_insert_description
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(description.into());
    }

    /// Number of external id lookups served so far
    pub fn external_id_query_count(&self) -> usize {
        self.external_id_queries.load(Ordering::SeqCst)
    }

    /// Number of classification lookups served so far
    pub fn classification_query_count(&self) -> usize {
        self.classification_queries.load(Ordering::SeqCst)
    }

    fn lock_accounts(&self) -> std::sync::MutexGuard<'_, Vec<Account>> {
        self.accounts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_transactions(&self) -> std::sync::MutexGuard<'_, Vec<Transaction>> {
        self.transactions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_classification_failure(&self) -> Result<()> {
        self.classification_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_classification.load(Ordering::SeqCst) {
            return Err(Error::database("classification lookup unavailable"));
        }
        Ok(())
    }

    /// Classified transactions, newest first
    fn classified_newest_first(&self) -> Vec<HistoricalClassification> {
        let transactions = self.lock_transactions();
        // Iterate in reverse so that, for equal timestamps, the later insert wins
        let mut rows: Vec<HistoricalClassification> = transactions
            .iter()
            .rev()
            .filter_map(|tx| {
                tx.classification().map(|classification| HistoricalClassification {
                    description: tx.description.clone(),
                    account_id: tx.account_id,
                    created_at: tx.created_at,
                    classification,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn find_latest_classified(
        &self,
        description: &str,
        account_id: Uuid,
    ) -> Result<Option<HistoricalClassification>> {
        self.check_classification_failure()?;
        Ok(self
            .classified_newest_first()
            .into_iter()
            .find(|row| row.description == description && row.account_id == account_id))
    }

    async fn find_classified_by_descriptions(
        &self,
        descriptions: &[String],
    ) -> Result<Vec<HistoricalClassification>> {
        self.check_classification_failure()?;
        let wanted: HashSet<&str> = descriptions.iter().map(String::as_str).collect();
        Ok(self
            .classified_newest_first()
            .into_iter()
            .filter(|row| wanted.contains(row.description.as_str()))
            .collect())
    }

    async fn find_existing_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<HashSet<String>> {
        self.external_id_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_external_ids.load(Ordering::SeqCst) {
            return Err(Error::database("external id lookup unavailable"));
        }
        let wanted: HashSet<&str> = external_ids.iter().map(String::as_str).collect();
        Ok(self
            .lock_transactions()
            .iter()
            .filter_map(|tx| tx.external_id.as_deref())
            .filter(|id| wanted.contains(id))
            .map(str::to_string)
            .collect())
    }

    async fn insert(&self, tx: &Transaction) -> Result<()> {
        let failing = self
            .fail_insert_description
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if failing.as_deref() == Some(tx.description.as_str()) {
            return Err(Error::database("insert rejected"));
        }
        self.lock_transactions().push(tx.clone());
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.lock_accounts().iter().find(|a| a.id == id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = self.lock_accounts().clone();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.lock_accounts();
        if accounts.iter().any(|a| a.id == account.id) {
            return Err(Error::database(format!("account {} already exists", account.id)));
        }
        accounts.push(account.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::{AccountType, TransactionKind};

    fn classified(description: &str, account_id: Uuid, age_minutes: i64) -> Transaction {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            account_id,
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            Decimal::new(1000, 2),
            description,
            TransactionKind::Despesa,
        );
        tx.category_id = Some(Uuid::new_v4());
        tx.payment_method_id = Some(Uuid::new_v4());
        tx.created_at = Utc::now() - Duration::minutes(age_minutes);
        tx
    }

    #[tokio::test]
    async fn test_bulk_lookup_is_newest_first() {
        let store = InMemoryStore::new();
        let account = Uuid::new_v4();
        store.seed(classified("UBER", account, 30));
        store.seed(classified("UBER", account, 5));
        store.seed(classified("IFOOD", account, 10));

        let rows = store
            .find_classified_by_descriptions(&["UBER".to_string(), "IFOOD".to_string()])
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_external_id_lookup_and_counter() {
        let store = InMemoryStore::new();
        store.seed(classified("PIX", Uuid::new_v4(), 1));
        let mut with_id = classified("TED", Uuid::new_v4(), 1);
        with_id.external_id = Some("abc".to_string());
        store.seed(with_id);

        let found = store
            .find_existing_external_ids(&["abc".to_string(), "zzz".to_string()])
            .await
            .unwrap();
        assert_eq!(found, HashSet::from(["abc".to_string()]));
        assert_eq!(store.external_id_query_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_account_insert_is_rejected() {
        let account = Account::new(Uuid::new_v4(), "Inter", AccountType::ContaCorrente);
        let store = InMemoryStore::with_accounts([account.clone()]);
        assert!(store.insert_account(&account).await.is_err());
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
    }
}
