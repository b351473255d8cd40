use super::account::{Account, AccountId};
use super::product::{Product, ProductId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for accounts, keyed by identity with a unique-name secondary index.
///
/// Every method is a single atomic step with respect to other calls on the
/// same store.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Adds a new account. Fails with `DuplicateId` or `DuplicateName`.
    async fn insert(&self, account: Account) -> Result<()>;
    /// Replaces an existing account. Fails with `NotFound` if the id is unknown
    /// and `DuplicateName` if the new name belongs to another account.
    async fn put(&self, account: Account) -> Result<()>;
    async fn get(&self, id: &AccountId) -> Result<Option<Account>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Account>>;
    async fn delete(&self, id: &AccountId) -> Result<()>;
    async fn list(
        &self,
        filter: &(dyn for<'a> Fn(&'a Account) -> bool + Send + Sync),
    ) -> Result<Vec<Account>>;
}

/// Storage for products, keyed by identity.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Adds a new product. Fails with `DuplicateId`.
    async fn insert(&self, product: Product) -> Result<()>;
    /// Replaces an existing product. Fails with `NotFound` if the id is unknown.
    async fn put(&self, product: Product) -> Result<()>;
    async fn get(&self, id: &ProductId) -> Result<Option<Product>>;
    async fn delete(&self, id: &ProductId) -> Result<()>;
    async fn list(
        &self,
        filter: &(dyn for<'a> Fn(&'a Product) -> bool + Send + Sync),
    ) -> Result<Vec<Product>>;
}

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type ProductStoreRef = Arc<dyn ProductStore>;
pub type ClockRef = Arc<dyn Clock>;
