//! Duplicate validator - drops candidates already in the ledger
//!
//! A candidate is a duplicate when its non-blank external id matches a
//! persisted transaction's external id. Candidates without an external id
//! are always new.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::ImportedTransaction;
use crate::ports::TransactionStore;

/// Candidates partitioned by persistence status, input order preserved
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateCheck {
    pub new: Vec<ImportedTransaction>,
    pub duplicates: Vec<ImportedTransaction>,
}

pub struct DuplicateValidator {
    store: Arc<dyn TransactionStore>,
}

impl DuplicateValidator {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Partition candidates into new and duplicate
    ///
    /// The store is queried once, and not at all when no candidate carries an
    /// external id. A failed lookup aborts the import.
    pub async fn check(&self, candidates: Vec<ImportedTransaction>) -> Result<DuplicateCheck> {
        let mut ids: Vec<String> = Vec::new();
        for id in candidates.iter().filter_map(ImportedTransaction::dedup_key) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }

        if ids.is_empty() {
            return Ok(DuplicateCheck {
                new: candidates,
                duplicates: Vec::new(),
            });
        }

        let existing: HashSet<String> = self
            .store
            .find_existing_external_ids(&ids)
            .await
            .map_err(|e| Error::DuplicateCheck(e.to_string()))?;

        let (duplicates, new): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|tx| tx.dedup_key().is_some_and(|id| existing.contains(id)));

        tracing::debug!(
            checked = ids.len(),
            duplicates = duplicates.len(),
            "duplicate check"
        );

        Ok(DuplicateCheck { new, duplicates })
    }
}
