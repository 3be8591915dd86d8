//! Importer - validates and persists candidates one row at a time

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{ImportedTransaction, SettlementStatus, Transaction};
use crate::ports::TransactionStore;

/// Characters of the description quoted in a row error
const ERROR_DESCRIPTION_CHARS: usize = 30;

/// Summary of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub total: usize,
    pub imported: usize,
    pub duplicated: usize,
    /// One entry per failed row, in row order
    pub errors: Vec<String>,
}

impl ImportResult {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    fn record(mut self, outcome: RowOutcome) -> Self {
        match outcome {
            RowOutcome::Imported => self.imported += 1,
            RowOutcome::Failed(message) => self.errors.push(message),
        }
        self
    }
}

/// What happened to a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Imported,
    Failed(String),
}

pub struct Importer {
    store: Arc<dyn TransactionStore>,
}

impl Importer {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Persist every candidate in order, collecting per-row failures
    ///
    /// Rows already persisted stay persisted when a later row fails.
    pub async fn import_all(&self, candidates: &[ImportedTransaction]) -> Result<ImportResult> {
        if candidates.is_empty() {
            return Err(Error::EmptyImport);
        }

        let mut result = ImportResult {
            total: candidates.len(),
            ..ImportResult::default()
        };

        for (index, candidate) in candidates.iter().enumerate() {
            let outcome = match self.import_one(candidate).await {
                Ok(()) => RowOutcome::Imported,
                Err(e) => RowOutcome::Failed(row_error(index + 1, &candidate.description, &e)),
            };
            result = result.record(outcome);
        }

        Ok(result)
    }

    async fn import_one(&self, candidate: &ImportedTransaction) -> Result<()> {
        let tx = to_transaction(candidate)?;
        self.store.insert(&tx).await
    }
}

/// Build the ledger row for a candidate
///
/// Imported rows are always persisted as `Realizado`, whatever status the
/// candidate was annotated with.
fn to_transaction(candidate: &ImportedTransaction) -> Result<Transaction> {
    let account_id = candidate
        .account_id
        .ok_or_else(|| Error::validation("Conta é obrigatória"))?;
    if candidate.description.trim().is_empty() {
        return Err(Error::validation("Descrição é obrigatória"));
    }
    if candidate.amount <= Decimal::ZERO {
        return Err(Error::validation("Valor deve ser maior que zero"));
    }

    let mut tx = Transaction::new(
        Uuid::new_v4(),
        account_id,
        candidate.date,
        candidate.amount,
        candidate.description.clone(),
        candidate.kind,
    );
    tx.status = SettlementStatus::Realizado;
    tx.external_id = candidate.dedup_key().map(str::to_string);
    if let Some(classification) = &candidate.classification {
        tx.apply_classification(classification);
    }
    Ok(tx)
}

fn row_error(line: usize, description: &str, error: &Error) -> String {
    let quoted: String = description.chars().take(ERROR_DESCRIPTION_CHARS).collect();
    format!("Linha {line} ({quoted}...): {error}")
}
