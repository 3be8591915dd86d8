//! Account store port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::Account;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>>;

    /// All accounts, ordered by name
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    async fn insert_account(&self, account: &Account) -> Result<()>;
}
