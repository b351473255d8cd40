use crate::domain::account::{Account, AccountId};
use crate::domain::ports::{AccountStore, ProductStore};
use crate::domain::product::{Product, ProductId};
use crate::error::{Result, VendingError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct AccountTable {
    by_id: HashMap<AccountId, Account>,
    id_by_name: HashMap<String, AccountId>,
}

/// A thread-safe in-memory store for accounts.
///
/// The primary map and the name index live behind one `RwLock`, so every
/// write updates both or neither.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    table: Arc<RwLock<AccountTable>>,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<()> {
        let mut table = self.table.write().await;
        if table.by_id.contains_key(&account.id) {
            return Err(VendingError::DuplicateId(account.id.to_string()));
        }
        if table.id_by_name.contains_key(&account.name) {
            return Err(VendingError::DuplicateName(account.name));
        }
        table
            .id_by_name
            .insert(account.name.clone(), account.id.clone());
        table.by_id.insert(account.id.clone(), account);
        Ok(())
    }

    async fn put(&self, account: Account) -> Result<()> {
        let mut table = self.table.write().await;
        let previous_name = match table.by_id.get(&account.id) {
            Some(existing) => existing.name.clone(),
            None => return Err(VendingError::NotFound(format!("account {}", account.id))),
        };
        if previous_name != account.name {
            if table.id_by_name.contains_key(&account.name) {
                return Err(VendingError::DuplicateName(account.name));
            }
            table.id_by_name.remove(&previous_name);
            table
                .id_by_name
                .insert(account.name.clone(), account.id.clone());
        }
        table.by_id.insert(account.id.clone(), account);
        Ok(())
    }

    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        let table = self.table.read().await;
        Ok(table.by_id.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Account>> {
        let table = self.table.read().await;
        Ok(table
            .id_by_name
            .get(name)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn delete(&self, id: &AccountId) -> Result<()> {
        let mut table = self.table.write().await;
        let removed = table
            .by_id
            .remove(id)
            .ok_or_else(|| VendingError::NotFound(format!("account {id}")))?;
        table.id_by_name.remove(&removed.name);
        Ok(())
    }

    async fn list(
        &self,
        filter: &(dyn for<'a> Fn(&'a Account) -> bool + Send + Sync),
    ) -> Result<Vec<Account>> {
        let table = self.table.read().await;
        Ok(table.by_id.values().filter(|a| filter(a)).cloned().collect())
    }
}

/// A thread-safe in-memory store for products.
///
/// Uses `Arc<RwLock<HashMap<ProductId, Product>>>` for shared concurrent access.
#[derive(Default, Clone)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductStore {
    /// Creates a new, empty in-memory product store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(VendingError::DuplicateId(product.id.to_string()));
        }
        products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn put(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(slot) => {
                *slot = product;
                Ok(())
            }
            None => Err(VendingError::NotFound(format!("product {}", product.id))),
        }
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(id).cloned())
    }

    async fn delete(&self, id: &ProductId) -> Result<()> {
        let mut products = self.products.write().await;
        products
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| VendingError::NotFound(format!("product {id}")))
    }

    async fn list(
        &self,
        filter: &(dyn for<'a> Fn(&'a Product) -> bool + Send + Sync),
    ) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(products.values().filter(|p| filter(p)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Role;
    use crate::domain::coin::{Balance, Price};

    fn account(id: &str, name: &str) -> Account {
        Account::new(AccountId::from(id), name, "hash".into(), Role::Buyer)
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::from(id),
            name: "Cola".into(),
            seller_id: AccountId::from("s1"),
            cost: Price::new(20).unwrap(),
            stock: 10,
        }
    }

    #[tokio::test]
    async fn test_in_memory_account_store() {
        let store = InMemoryAccountStore::new();
        let mut acc = account("1", "alice");
        acc.deposit = Balance::new(100);

        store.insert(acc.clone()).await.unwrap();
        let retrieved = store.get(&AccountId::from("1")).await.unwrap().unwrap();
        assert_eq!(retrieved, acc);

        assert!(store.get(&AccountId::from("2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_account_uniqueness() {
        let store = InMemoryAccountStore::new();
        store.insert(account("1", "alice")).await.unwrap();

        assert!(matches!(
            store.insert(account("1", "bob")).await,
            Err(VendingError::DuplicateId(_))
        ));
        assert!(matches!(
            store.insert(account("2", "alice")).await,
            Err(VendingError::DuplicateName(_))
        ));
        // Names are case-sensitive.
        store.insert(account("3", "Alice")).await.unwrap();
    }

    #[tokio::test]
    async fn test_name_index_follows_renames() {
        let store = InMemoryAccountStore::new();
        store.insert(account("1", "alice")).await.unwrap();
        store.insert(account("2", "bob")).await.unwrap();

        let mut renamed = account("1", "carol");
        store.put(renamed.clone()).await.unwrap();
        assert!(store.find_by_name("alice").await.unwrap().is_none());
        assert_eq!(store.find_by_name("carol").await.unwrap().unwrap().id, renamed.id);

        renamed.name = "bob".into();
        assert!(matches!(
            store.put(renamed).await,
            Err(VendingError::DuplicateName(_))
        ));
        assert_eq!(store.find_by_name("carol").await.unwrap().unwrap().id.as_str(), "1");
    }

    #[tokio::test]
    async fn test_account_put_requires_existing_record() {
        let store = InMemoryAccountStore::new();
        assert!(matches!(
            store.put(account("1", "alice")).await,
            Err(VendingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_account_delete_releases_name() {
        let store = InMemoryAccountStore::new();
        store.insert(account("1", "alice")).await.unwrap();
        store.delete(&AccountId::from("1")).await.unwrap();
        assert!(matches!(
            store.delete(&AccountId::from("1")).await,
            Err(VendingError::NotFound(_))
        ));
        store.insert(account("2", "alice")).await.unwrap();
    }

    #[tokio::test]
    async fn test_account_list_filter() {
        let store = InMemoryAccountStore::new();
        store.insert(account("1", "alice")).await.unwrap();
        store.insert(account("2", "bob")).await.unwrap();

        let all = store.list(&|_| true).await.unwrap();
        assert_eq!(all.len(), 2);
        let bobs = store.list(&|a: &Account| a.name == "bob").await.unwrap();
        assert_eq!(bobs.len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_product_store() {
        let store = InMemoryProductStore::new();
        store.insert(product("p1")).await.unwrap();
        assert!(matches!(
            store.insert(product("p1")).await,
            Err(VendingError::DuplicateId(_))
        ));

        let mut updated = product("p1");
        updated.stock = 3;
        store.put(updated.clone()).await.unwrap();
        assert_eq!(
            store.get(&ProductId::from("p1")).await.unwrap().unwrap(),
            updated
        );

        assert!(matches!(
            store.put(product("p2")).await,
            Err(VendingError::NotFound(_))
        ));

        store.delete(&ProductId::from("p1")).await.unwrap();
        assert!(store.list(&|_| true).await.unwrap().is_empty());
    }
}
