//! Transaction store port - persistence used by the import pipeline

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{HistoricalClassification, Transaction};

/// Transaction persistence abstraction
///
/// The import pipeline only ever talks to the ledger through this trait, so
/// it can run against DuckDB or an in-memory fake.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Most recently created transaction matching `description` and
    /// `account_id` exactly that has both a category and a payment method
    async fn find_latest_classified(
        &self,
        description: &str,
        account_id: Uuid,
    ) -> Result<Option<HistoricalClassification>>;

    /// All classified transactions whose description is one of `descriptions`
    ///
    /// Implementations MUST return rows ordered by creation time, newest
    /// first. Batch classification keeps the first row seen per
    /// (description, account) and relies on this ordering.
    async fn find_classified_by_descriptions(
        &self,
        descriptions: &[String],
    ) -> Result<Vec<HistoricalClassification>>;

    /// Subset of `external_ids` already present in the ledger
    async fn find_existing_external_ids(&self, external_ids: &[String])
        -> Result<HashSet<String>>;

    /// Insert one transaction
    async fn insert(&self, tx: &Transaction) -> Result<()>;
}
