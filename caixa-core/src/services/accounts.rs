//! Account service - accounts and their default settlement status

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountType, AccountWithDefaultStatus};
use crate::ports::AccountStore;

pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    pub async fn create_account(&self, name: &str, account_type: AccountType) -> Result<Account> {
        let account = Account::new(Uuid::new_v4(), name.trim(), account_type);
        account.validate().map_err(Error::validation)?;
        self.store.insert_account(&account).await?;
        tracing::info!(account_id = %account.id, account_type = %account.account_type, "account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Account> {
        self.store
            .get_account(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Conta {id}")))
    }

    /// Every account with the status its imports default to
    pub async fn list_accounts_with_status(&self) -> Result<Vec<AccountWithDefaultStatus>> {
        Ok(self
            .store
            .list_accounts()
            .await?
            .iter()
            .map(AccountWithDefaultStatus::from_account)
            .collect())
    }
}
