use super::ledger::{ID_ATTEMPTS, Ledger};
use crate::domain::account::{Account, AccountId, Role};
use crate::domain::coin::Price;
use crate::domain::product::{Product, ProductId};
use crate::error::{Result, VendingError};
use tracing::info;

/// Fields a seller supplies when creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub cost: u64,
    pub stock: u32,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, cost: u64, stock: u32) -> Self {
        Self {
            name: name.into(),
            cost,
            stock,
        }
    }

    fn validate(&self) -> Result<Price> {
        if self.name.trim().is_empty() {
            return Err(VendingError::InvalidInput(
                "invalid product name".to_string(),
            ));
        }
        Price::new(self.cost)
    }
}

/// Product reads for everyone and writes for sellers.
pub struct Catalog {
    ledger: Ledger,
}

impl Catalog {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    pub async fn get_product(&self, id: &ProductId) -> Result<Product> {
        self.ledger.product(id).await
    }

    /// Lists all products, or those whose name equals `name`.
    pub async fn list_products(&self, name: Option<&str>) -> Result<Vec<Product>> {
        match name {
            Some(name) => self.ledger.products().list(&|p: &Product| p.name == name).await,
            None => self.ledger.products().list(&|_| true).await,
        }
    }

    async fn seller(&self, caller: &AccountId) -> Result<Account> {
        let account = self.ledger.account(caller).await?;
        account.require_role(Role::Seller)?;
        Ok(account)
    }

    pub async fn create_product(&self, caller: &AccountId, draft: ProductDraft) -> Result<Product> {
        let cost = draft.validate()?;
        // Held so the seller cannot be deleted while gaining a product.
        let _guard = self.ledger.lock_account(caller).await;
        let seller = self.seller(caller).await?;

        for _ in 0..ID_ATTEMPTS {
            let product = Product {
                id: ProductId::generate(),
                name: draft.name.clone(),
                seller_id: seller.id.clone(),
                cost,
                stock: draft.stock,
            };
            match self.ledger.products().insert(product.clone()).await {
                Ok(()) => {
                    info!(product = %product.id, seller = %seller.id, "product created");
                    return Ok(product);
                }
                Err(VendingError::DuplicateId(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(VendingError::Conflict(
            "could not allocate a product id".to_string(),
        ))
    }

    /// Loads a product the caller is allowed to change.
    async fn owned_product(&self, caller: &AccountId, id: &ProductId) -> Result<Product> {
        self.seller(caller).await?;
        let product = self.ledger.product(id).await?;
        if !product.is_owned_by(caller) {
            return Err(VendingError::Forbidden(
                "the current user does not own this product".to_string(),
            ));
        }
        Ok(product)
    }

    /// Replaces name, cost and stock of a product owned by the caller.
    pub async fn update_product(
        &self,
        caller: &AccountId,
        id: &ProductId,
        draft: ProductDraft,
    ) -> Result<Product> {
        let cost = draft.validate()?;
        let _guard = self.ledger.lock_product(id).await;
        let mut product = self.owned_product(caller, id).await?;

        product.name = draft.name;
        product.cost = cost;
        product.stock = draft.stock;
        self.ledger.products().put(product.clone()).await?;

        info!(product = %id, stock = product.stock, cost = cost.value(), "product updated");
        Ok(product)
    }

    pub async fn delete_product(&self, caller: &AccountId, id: &ProductId) -> Result<()> {
        let _guard = self.ledger.lock_product(id).await;
        self.owned_product(caller, id).await?;
        self.ledger.products().delete(id).await?;

        info!(product = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{InMemoryAccountStore, InMemoryProductStore};
    use std::sync::Arc;

    async fn setup() -> Catalog {
        let ledger = Ledger::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryProductStore::new()),
        );
        for (id, role) in [("s1", Role::Seller), ("s2", Role::Seller), ("b1", Role::Buyer)] {
            ledger
                .accounts()
                .insert(Account::new(AccountId::from(id), id, String::new(), role))
                .await
                .unwrap();
        }
        Catalog::new(ledger)
    }

    #[tokio::test]
    async fn test_seller_creates_owned_product() {
        let catalog = setup().await;
        let product = catalog
            .create_product(&AccountId::from("s1"), ProductDraft::new("Cola", 20, 10))
            .await
            .unwrap();
        assert_eq!(product.seller_id, AccountId::from("s1"));
        assert_eq!(catalog.get_product(&product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let catalog = setup().await;
        let seller = AccountId::from("s1");
        for draft in [
            ProductDraft::new("Cola", 22, 1),
            ProductDraft::new("Cola", 0, 1),
            ProductDraft::new("  ", 20, 1),
        ] {
            assert!(matches!(
                catalog.create_product(&seller, draft).await,
                Err(VendingError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            catalog
                .create_product(&AccountId::from("b1"), ProductDraft::new("Cola", 20, 1))
                .await,
            Err(VendingError::Forbidden(_))
        ));
        assert!(catalog.list_products(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_owner_may_update_or_delete() {
        let catalog = setup().await;
        let product = catalog
            .create_product(&AccountId::from("s1"), ProductDraft::new("Cola", 20, 10))
            .await
            .unwrap();

        assert!(matches!(
            catalog
                .update_product(
                    &AccountId::from("s2"),
                    &product.id,
                    ProductDraft::new("Stolen", 5, 0)
                )
                .await,
            Err(VendingError::Forbidden(_))
        ));
        assert!(matches!(
            catalog.delete_product(&AccountId::from("s2"), &product.id).await,
            Err(VendingError::Forbidden(_))
        ));
        assert!(matches!(
            catalog.delete_product(&AccountId::from("b1"), &product.id).await,
            Err(VendingError::Forbidden(_))
        ));
        assert_eq!(catalog.get_product(&product.id).await.unwrap(), product);

        let updated = catalog
            .update_product(
                &AccountId::from("s1"),
                &product.id,
                ProductDraft::new("Cola Zero", 25, 3),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Cola Zero");
        assert_eq!(updated.cost.value(), 25);
        assert_eq!(updated.stock, 3);

        catalog
            .delete_product(&AccountId::from("s1"), &product.id)
            .await
            .unwrap();
        assert!(matches!(
            catalog.get_product(&product.id).await,
            Err(VendingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let catalog = setup().await;
        assert!(matches!(
            catalog
                .update_product(
                    &AccountId::from("s1"),
                    &ProductId::from("nope"),
                    ProductDraft::new("Cola", 20, 1)
                )
                .await,
            Err(VendingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_name() {
        let catalog = setup().await;
        let seller = AccountId::from("s1");
        catalog
            .create_product(&seller, ProductDraft::new("Cola", 20, 1))
            .await
            .unwrap();
        catalog
            .create_product(&seller, ProductDraft::new("Chips", 30, 1))
            .await
            .unwrap();

        assert_eq!(catalog.list_products(None).await.unwrap().len(), 2);
        let colas = catalog.list_products(Some("Cola")).await.unwrap();
        assert_eq!(colas.len(), 1);
        assert_eq!(colas[0].name, "Cola");
    }
}
