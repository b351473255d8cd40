use super::account::AccountId;
use super::coin::Price;
use crate::error::{Result, VendingError};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, store-unique product identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An item offered by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// The seller who created the product; the only account allowed to change it.
    pub seller_id: AccountId,
    pub cost: Price,
    pub stock: u32,
}

impl Product {
    pub fn is_owned_by(&self, account: &AccountId) -> bool {
        &self.seller_id == account
    }

    /// Removes `quantity` units from stock.
    pub fn take(&mut self, quantity: u32) -> Result<()> {
        if self.stock < quantity {
            return Err(VendingError::NotEnoughStock {
                available: self.stock,
                requested: quantity,
            });
        }
        self.stock -= quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: u32) -> Product {
        Product {
            id: ProductId::from("p1"),
            name: "Cola".into(),
            seller_id: AccountId::from("s1"),
            cost: Price::new(20).unwrap(),
            stock,
        }
    }

    #[test]
    fn test_take_decrements_stock() {
        let mut p = product(1000);
        p.take(3).unwrap();
        assert_eq!(p.stock, 997);
    }

    #[test]
    fn test_take_rejects_oversell() {
        let mut p = product(1);
        assert!(matches!(
            p.take(2),
            Err(VendingError::NotEnoughStock {
                available: 1,
                requested: 2
            })
        ));
        assert_eq!(p.stock, 1);
    }

    #[test]
    fn test_ownership() {
        let p = product(1);
        assert!(p.is_owned_by(&AccountId::from("s1")));
        assert!(!p.is_owned_by(&AccountId::from("s2")));
    }
}
