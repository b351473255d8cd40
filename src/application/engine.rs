use super::ledger::Ledger;
use crate::domain::account::{AccountId, Role};
use crate::domain::coin::{Balance, Change, Coin, make_change};
use crate::domain::product::{Product, ProductId};
use crate::error::{Result, VendingError};
use serde::Serialize;
use tracing::{error, info, instrument};

/// Outcome of a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Purchase {
    pub product_name: String,
    pub total_cost: u64,
    pub change: Change,
}

/// Deposit, purchase and refund for buyer accounts.
///
/// Every operation runs under the buyer's record lock; `buy` additionally
/// holds the product's lock, taken after the account's.
pub struct VendingEngine {
    ledger: Ledger,
}

impl VendingEngine {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Adds one coin to the buyer's deposit and returns the new balance.
    #[instrument(skip(self, caller), fields(account = %caller))]
    pub async fn deposit(&self, caller: &AccountId, coin_value: u64) -> Result<Balance> {
        let coin = Coin::new(coin_value)?;

        let _guard = self.ledger.lock_account(caller).await;
        let mut account = self.ledger.account(caller).await?;
        account.require_role(Role::Buyer)?;

        let balance = account.credit(coin)?;
        self.ledger.accounts().put(account).await?;

        info!(coin = coin.value(), balance = balance.value(), "coin deposited");
        Ok(balance)
    }

    /// Buys `quantity` units, spending the whole deposit and paying back the
    /// difference as change.
    ///
    /// Nothing is written unless every check passes. The stock decrement and
    /// the deposit reset are applied as one unit: if the second write fails the
    /// first is rolled back, and if the rollback fails too the call returns
    /// [`VendingError::Inconsistent`].
    ///
    /// The product is written before the account. Readers that take no record
    /// lock (catalog reads, account lookups, the state dump) can observe the
    /// decremented stock while the deposit is not yet cleared, until the
    /// account write lands or the rollback restores the stock.
    #[instrument(skip(self, caller, product_id), fields(account = %caller, product = %product_id))]
    pub async fn buy(
        &self,
        caller: &AccountId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Purchase> {
        if quantity == 0 {
            return Err(VendingError::InvalidInput(
                "amount of products should be at least 1".to_string(),
            ));
        }

        let _account_guard = self.ledger.lock_account(caller).await;
        let mut account = self.ledger.account(caller).await?;
        account.require_role(Role::Buyer)?;

        let _product_guard = self.ledger.lock_product(product_id).await;
        let product = self.ledger.product(product_id).await?;

        let total_cost = product.cost.times(quantity)?;
        let remainder = account
            .deposit
            .checked_sub(total_cost)
            .ok_or(VendingError::NotEnoughDeposit {
                deposit: account.deposit.value(),
                required: total_cost.value(),
            })?;

        let mut updated_product = product.clone();
        updated_product.take(quantity)?;

        let change = make_change(remainder.value()).inspect_err(|e| {
            error!(remainder = remainder.value(), "{e}");
        })?;

        account.drain_deposit();

        self.ledger.products().put(updated_product).await?;
        if let Err(write_err) = self.ledger.accounts().put(account).await {
            return Err(self.roll_back_stock(product, write_err).await);
        }

        info!(
            quantity,
            total_cost = total_cost.value(),
            change = %change,
            "purchase completed"
        );
        Ok(Purchase {
            product_name: product.name,
            total_cost: total_cost.value(),
            change,
        })
    }

    async fn roll_back_stock(
        &self,
        original: Product,
        write_err: VendingError,
    ) -> VendingError {
        let product_id = original.id.clone();
        match self.ledger.products().put(original).await {
            Ok(()) => {
                error!(product = %product_id, "deposit write failed, stock restored: {write_err}");
                write_err
            }
            Err(rollback_err) => {
                error!(
                    product = %product_id,
                    "deposit write failed and stock could not be restored: {write_err}; {rollback_err}"
                );
                VendingError::Inconsistent(format!(
                    "stock of product {product_id} was decremented but the deposit was not cleared"
                ))
            }
        }
    }

    /// Pays back the whole deposit and empties it.
    #[instrument(skip(self, caller), fields(account = %caller))]
    pub async fn reset(&self, caller: &AccountId) -> Result<Change> {
        let _guard = self.ledger.lock_account(caller).await;
        let mut account = self.ledger.account(caller).await?;
        account.require_role(Role::Buyer)?;

        let change = make_change(account.deposit.value()).inspect_err(|e| {
            error!(deposit = account.deposit.value(), "{e}");
        })?;
        account.drain_deposit();
        self.ledger.accounts().put(account).await?;

        info!(change = %change, "deposit returned");
        Ok(change)
    }
}
