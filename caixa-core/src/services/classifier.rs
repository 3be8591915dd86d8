//! Lineage classifier - suggests classification from transaction history
//!
//! A new transaction inherits the classification of the most recently
//! created persisted transaction with the same description on the same
//! account. Only rows with both category and payment method count.
//!
//! Lookups never fail the import: store errors are logged and read as
//! "no suggestion".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{ClassificationData, ClassificationKey, ImportedTransaction};
use crate::ports::TransactionStore;

pub struct LineageClassifier {
    store: Arc<dyn TransactionStore>,
}

impl LineageClassifier {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Suggestion for one description on one account
    pub async fn classify(&self, description: &str, account_id: Uuid) -> Option<ClassificationData> {
        match self.store.find_latest_classified(description, account_id).await {
            Ok(found) => found.map(|row| row.classification),
            Err(e) => {
                tracing::warn!(error = %e, "classification lookup failed");
                None
            }
        }
    }

    /// Suggestions for many (description, account) pairs with one store call
    ///
    /// Only requested pairs with a match appear in the result. For each pair
    /// the newest row wins, which relies on the store returning rows newest
    /// first.
    pub async fn classify_batch(
        &self,
        pairs: &[(String, Uuid)],
    ) -> HashMap<ClassificationKey, ClassificationData> {
        if pairs.is_empty() {
            return HashMap::new();
        }

        let wanted: HashSet<ClassificationKey> = pairs
            .iter()
            .map(|(description, account_id)| ClassificationKey::new(description.clone(), *account_id))
            .collect();

        let mut descriptions: Vec<String> = Vec::new();
        for (description, _) in pairs {
            if !descriptions.contains(description) {
                descriptions.push(description.clone());
            }
        }

        let rows = match self.store.find_classified_by_descriptions(&descriptions).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "batch classification lookup failed");
                return HashMap::new();
            }
        };

        let mut suggestions = HashMap::new();
        for row in rows {
            let key = row.key();
            if wanted.contains(&key) {
                suggestions.entry(key).or_insert(row.classification);
            }
        }

        tracing::debug!(
            requested = wanted.len(),
            matched = suggestions.len(),
            "batch classification"
        );
        suggestions
    }

    /// Annotated copies of the candidates carrying their suggestion
    ///
    /// Candidates without an account get no suggestion.
    pub async fn enrich(&self, candidates: &[ImportedTransaction]) -> Vec<ImportedTransaction> {
        let pairs: Vec<(String, Uuid)> = candidates
            .iter()
            .filter_map(|tx| tx.account_id.map(|id| (tx.description.clone(), id)))
            .collect();
        let suggestions = self.classify_batch(&pairs).await;

        candidates
            .iter()
            .map(|tx| {
                let suggestion = tx.account_id.and_then(|account_id| {
                    suggestions
                        .get(&ClassificationKey::new(tx.description.clone(), account_id))
                        .cloned()
                });
                tx.with_classification(suggestion)
            })
            .collect()
    }
}
