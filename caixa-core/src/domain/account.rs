//! Account domain model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of financial account
///
/// Stored as a freeform string. Known values map to dedicated variants,
/// anything else is preserved as `Other` so that data written by other
/// clients round-trips untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    ContaCorrente,
    Poupanca,
    CartaoCredito,
    Investimento,
    Dinheiro,
    CarteiraDigital,
    Other(String),
}

impl AccountType {
    /// Every known account type, in display order
    pub const KNOWN: [AccountType; 6] = [
        AccountType::ContaCorrente,
        AccountType::Poupanca,
        AccountType::CartaoCredito,
        AccountType::Investimento,
        AccountType::Dinheiro,
        AccountType::CarteiraDigital,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            AccountType::ContaCorrente => "conta_corrente",
            AccountType::Poupanca => "poupanca",
            AccountType::CartaoCredito => "cartao_credito",
            AccountType::Investimento => "investimento",
            AccountType::Dinheiro => "dinheiro",
            AccountType::CarteiraDigital => "carteira_digital",
            AccountType::Other(s) => s,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &str {
        match self {
            AccountType::ContaCorrente => "Conta corrente",
            AccountType::Poupanca => "Poupança",
            AccountType::CartaoCredito => "Cartão de crédito",
            AccountType::Investimento => "Investimento",
            AccountType::Dinheiro => "Dinheiro",
            AccountType::CarteiraDigital => "Carteira digital",
            AccountType::Other(s) => s,
        }
    }
}

impl From<&str> for AccountType {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "conta_corrente" | "corrente" => AccountType::ContaCorrente,
            "poupanca" | "poupança" => AccountType::Poupanca,
            "cartao_credito" | "cartão_crédito" | "cartao" => AccountType::CartaoCredito,
            "investimento" => AccountType::Investimento,
            "dinheiro" => AccountType::Dinheiro,
            "carteira_digital" => AccountType::CarteiraDigital,
            _ => AccountType::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for AccountType {
    fn from(value: String) -> Self {
        AccountType::from(value.as_str())
    }
}

impl From<AccountType> for String {
    fn from(value: AccountType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A financial account owned by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with required fields
    pub fn new(id: Uuid, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id,
            name: name.into(),
            account_type,
            created_at: Utc::now(),
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("account name cannot be empty");
        }
        if self.account_type.as_str().trim().is_empty() {
            return Err("account type cannot be empty");
        }
        Ok(())
    }
}
