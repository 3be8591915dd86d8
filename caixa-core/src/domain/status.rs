//! Settlement status and the per-account-type default

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::{Account, AccountType};

/// Whether a transaction has already settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Expected, not yet settled (e.g. a credit card purchase before the bill closes)
    Previsto,
    /// Settled
    Realizado,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Previsto => "previsto",
            SettlementStatus::Realizado => "realizado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "previsto" => Some(SettlementStatus::Previsto),
            "realizado" => Some(SettlementStatus::Realizado),
            _ => None,
        }
    }
}

/// Default settlement status for a freshly imported transaction
///
/// Credit card transactions are only expected until the bill is paid; every
/// other account type settles immediately. Unknown types fall back to
/// `Realizado`.
pub fn detect_default_status(account_type: &AccountType) -> SettlementStatus {
    match account_type {
        AccountType::CartaoCredito => SettlementStatus::Previsto,
        AccountType::ContaCorrente
        | AccountType::Poupanca
        | AccountType::Investimento
        | AccountType::Dinheiro
        | AccountType::CarteiraDigital => SettlementStatus::Realizado,
        AccountType::Other(_) => SettlementStatus::Realizado,
    }
}

pub fn status_description(status: SettlementStatus) -> &'static str {
    match status {
        SettlementStatus::Previsto => "Transações importadas ficam previstas até o pagamento da fatura",
        SettlementStatus::Realizado => "Transações importadas entram como realizadas",
    }
}

pub fn status_icon(status: SettlementStatus) -> &'static str {
    match status {
        SettlementStatus::Previsto => "clock",
        SettlementStatus::Realizado => "check-circle",
    }
}

pub fn status_color(status: SettlementStatus) -> &'static str {
    match status {
        SettlementStatus::Previsto => "yellow",
        SettlementStatus::Realizado => "green",
    }
}

/// An account enriched with its derived default status
#[derive(Debug, Clone, Serialize)]
pub struct AccountWithDefaultStatus {
    pub id: Uuid,
    pub name: String,
    pub account_type: AccountType,
    pub default_status: SettlementStatus,
    pub status_description: &'static str,
}

impl AccountWithDefaultStatus {
    pub fn from_account(account: &Account) -> Self {
        let default_status = detect_default_status(&account.account_type);
        Self {
            id: account.id,
            name: account.name.clone(),
            account_type: account.account_type.clone(),
            default_status,
            status_description: status_description(default_status),
        }
    }
}
