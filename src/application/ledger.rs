use crate::domain::account::{Account, AccountId};
use crate::domain::ports::{AccountStore, AccountStoreRef, ProductStore, ProductStoreRef};
use crate::domain::product::{Product, ProductId};
use crate::error::{Result, VendingError};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Attempts made to find an unused store-assigned identity.
pub(crate) const ID_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Account(AccountId),
    Product(ProductId),
}

type Slots = DashMap<RecordKey, Arc<AsyncMutex<()>>>;

/// One async mutex per record, created on first use and dropped again once
/// nobody holds or waits for it.
///
/// Read-modify-write sequences hold the record's guard for their whole
/// duration. Operations touching both an account and a product always lock
/// the account first.
#[derive(Default, Clone)]
pub struct RecordLocks {
    slots: Arc<Slots>,
}

impl RecordLocks {
    pub async fn lock(&self, key: RecordKey) -> RecordGuard {
        // The shard lock is released before awaiting the record's mutex.
        let slot = Arc::clone(self.slots.entry(key.clone()).or_default().value());
        let guard = slot.lock_owned().await;
        RecordGuard {
            guard: Some(guard),
            key,
            slots: Arc::clone(&self.slots),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Exclusive access to one record until dropped.
pub struct RecordGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: RecordKey,
    slots: Arc<Slots>,
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Holders and waiters each keep a clone; only the map's is left when idle.
        self.slots.remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}

/// Shared handle on both stores and the lock registry guarding them.
#[derive(Clone)]
pub struct Ledger {
    accounts: AccountStoreRef,
    products: ProductStoreRef,
    locks: RecordLocks,
}

impl Ledger {
    pub fn new(accounts: AccountStoreRef, products: ProductStoreRef) -> Self {
        Self {
            accounts,
            products,
            locks: RecordLocks::default(),
        }
    }

    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    pub fn products(&self) -> &dyn ProductStore {
        self.products.as_ref()
    }

    pub fn locks(&self) -> &RecordLocks {
        &self.locks
    }

    pub async fn lock_account(&self, id: &AccountId) -> RecordGuard {
        self.locks.lock(RecordKey::Account(id.clone())).await
    }

    pub async fn lock_product(&self, id: &ProductId) -> RecordGuard {
        self.locks.lock(RecordKey::Product(id.clone())).await
    }

    pub async fn account(&self, id: &AccountId) -> Result<Account> {
        self.accounts
            .get(id)
            .await?
            .ok_or_else(|| VendingError::NotFound(format!("account {id}")))
    }

    pub async fn product(&self, id: &ProductId) -> Result<Product> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| VendingError::NotFound(format!("product {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_record_is_serialized() {
        let locks = RecordLocks::default();
        let key = RecordKey::Account(AccountId::from("a"));

        let guard = locks.lock(key.clone()).await;
        let contender = {
            let locks = locks.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        assert_eq!(locks.len(), 1);
        drop(guard);
        contender.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_records_do_not_block() {
        let locks = RecordLocks::default();
        let _a = locks.lock(RecordKey::Account(AccountId::from("a"))).await;
        let _p = locks.lock(RecordKey::Product(ProductId::from("a"))).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_slots_are_released() {
        let locks = RecordLocks::default();
        for i in 0..1_000 {
            drop(locks.lock(RecordKey::Product(ProductId::from(format!("p{i}")))).await);
            drop(locks.lock(RecordKey::Account(AccountId::from(format!("a{i}")))).await);
        }
        assert!(locks.is_empty());
    }
}
