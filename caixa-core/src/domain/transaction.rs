//! Transaction domain models
//!
//! `ImportedTransaction` is a candidate produced from a bank statement row;
//! `Transaction` is what ends up persisted in the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::SettlementStatus;

/// Direction of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Receita,
    Despesa,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Receita => "receita",
            TransactionKind::Despesa => "despesa",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receita" => Some(TransactionKind::Receita),
            "despesa" => Some(TransactionKind::Despesa),
            _ => None,
        }
    }
}

/// Classification suggestion derived from earlier transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationData {
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub payment_method_id: Uuid,
    pub cost_center_id: Option<Uuid>,
}

/// Composite key used by batch classification: exact description + account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassificationKey {
    pub description: String,
    pub account_id: Uuid,
}

impl ClassificationKey {
    pub fn new(description: impl Into<String>, account_id: Uuid) -> Self {
        Self {
            description: description.into(),
            account_id,
        }
    }
}

/// A persisted transaction's classification, as returned by lineage lookups
#[derive(Debug, Clone)]
pub struct HistoricalClassification {
    pub description: String,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub classification: ClassificationData,
}

impl HistoricalClassification {
    pub fn key(&self) -> ClassificationKey {
        ClassificationKey::new(self.description.clone(), self.account_id)
    }
}

/// Candidate transaction mapped from a bank statement row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedTransaction {
    pub date: NaiveDate,
    /// Positive magnitude; direction lives in `kind`
    pub amount: Decimal,
    /// Bank-provided identifier used for duplicate detection
    pub external_id: Option<String>,
    pub description: String,
    pub account_id: Option<Uuid>,
    pub kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SettlementStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationData>,
}

impl ImportedTransaction {
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        account_id: Uuid,
        kind: TransactionKind,
    ) -> Self {
        Self {
            date,
            amount,
            external_id: None,
            description: description.into(),
            account_id: Some(account_id),
            kind,
            status: None,
            classification: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Annotated copy carrying a settlement status
    pub fn with_status(&self, status: SettlementStatus) -> Self {
        Self {
            status: Some(status),
            ..self.clone()
        }
    }

    /// Annotated copy carrying a classification suggestion
    pub fn with_classification(&self, classification: Option<ClassificationData>) -> Self {
        Self {
            classification,
            ..self.clone()
        }
    }

    /// External id if present and non-blank
    pub fn dedup_key(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A transaction persisted in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub kind: TransactionKind,
    pub status: SettlementStatus,
    pub external_id: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub cost_center_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new unclassified transaction
    pub fn new(
        id: Uuid,
        account_id: Uuid,
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id,
            account_id,
            date,
            amount,
            description: description.into(),
            kind,
            status: SettlementStatus::Realizado,
            external_id: None,
            category_id: None,
            subcategory_id: None,
            payment_method_id: None,
            cost_center_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn apply_classification(&mut self, classification: &ClassificationData) {
        self.category_id = Some(classification.category_id);
        self.subcategory_id = classification.subcategory_id;
        self.payment_method_id = Some(classification.payment_method_id);
        self.cost_center_id = classification.cost_center_id;
    }

    /// Classification, if both category and payment method are set
    pub fn classification(&self) -> Option<ClassificationData> {
        Some(ClassificationData {
            category_id: self.category_id?,
            subcategory_id: self.subcategory_id,
            payment_method_id: self.payment_method_id?,
            cost_center_id: self.cost_center_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> ImportedTransaction {
        ImportedTransaction::new(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            Decimal::new(4590, 2),
            "PADARIA REAL",
            Uuid::new_v4(),
            TransactionKind::Despesa,
        )
    }

    #[test]
    fn test_annotation_returns_new_value() {
        let original = candidate();
        let annotated = original.with_status(SettlementStatus::Previsto);

        assert_eq!(original.status, None);
        assert_eq!(annotated.status, Some(SettlementStatus::Previsto));
        assert_eq!(annotated.description, original.description);
    }

    #[test]
    fn test_dedup_key_ignores_blank_ids() {
        assert_eq!(candidate().dedup_key(), None);
        assert_eq!(candidate().with_external_id("   ").dedup_key(), None);
        assert_eq!(candidate().with_external_id(" abc ").dedup_key(), Some("abc"));
    }

    #[test]
    fn test_classification_requires_category_and_payment_method() {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            Decimal::new(100, 0),
            "ALUGUEL",
            TransactionKind::Despesa,
        );
        assert!(tx.classification().is_none());

        tx.category_id = Some(Uuid::new_v4());
        assert!(tx.classification().is_none());

        tx.payment_method_id = Some(Uuid::new_v4());
        let classification = tx.classification().unwrap();
        assert_eq!(Some(classification.category_id), tx.category_id);
    }

    #[test]
    fn test_kind_serde() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Receita).unwrap(),
            "\"receita\""
        );
        assert_eq!(TransactionKind::parse("despesa"), Some(TransactionKind::Despesa));
    }
}
