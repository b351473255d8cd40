use super::credentials::PasswordHasher;
use super::ledger::{ID_ATTEMPTS, Ledger};
use crate::domain::account::{Account, AccountId, Role};
use crate::domain::product::Product;
use crate::error::{Result, VendingError};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub password: String,
    pub role: Role,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            role,
        }
    }
}

fn require_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(VendingError::InvalidInput("invalid password".to_string()));
    }
    Ok(())
}

/// Registration and account self-service.
///
/// A non-admin caller may only read, change or delete its own account. The
/// admin may act on any account and is the only one allowed to list them.
pub struct AccountDirectory {
    ledger: Ledger,
    hasher: Arc<PasswordHasher>,
}

impl AccountDirectory {
    pub fn new(ledger: Ledger, hasher: Arc<PasswordHasher>) -> Self {
        Self { ledger, hasher }
    }

    #[instrument(skip(self, new), fields(name = %new.name, role = %new.role))]
    pub async fn register(&self, new: NewAccount) -> Result<Account> {
        if new.role == Role::Admin {
            return Err(VendingError::InvalidInput(
                "cannot create admin user".to_string(),
            ));
        }
        self.create(new).await
    }

    /// Creates the configured admin account. Calling it again with the name
    /// of the existing admin is a no-op.
    pub async fn bootstrap_admin(&self, name: &str, password: &str) -> Result<Account> {
        if let Some(existing) = self.ledger.accounts().find_by_name(name).await? {
            if existing.is_admin() {
                return Ok(existing);
            }
            return Err(VendingError::DuplicateName(name.to_string()));
        }
        let admin = self
            .create(NewAccount::new(name, password, Role::Admin))
            .await?;
        info!(account = %admin.id, "admin account bootstrapped");
        Ok(admin)
    }

    async fn create(&self, new: NewAccount) -> Result<Account> {
        if new.name.trim().is_empty() {
            return Err(VendingError::InvalidInput("invalid user name".to_string()));
        }
        require_password(&new.password)?;
        let password_hash = self.hasher.hash(&new.password)?;

        for _ in 0..ID_ATTEMPTS {
            let account = Account::new(
                AccountId::generate(),
                new.name.clone(),
                password_hash.clone(),
                new.role,
            );
            match self.ledger.accounts().insert(account.clone()).await {
                Ok(()) => {
                    info!(account = %account.id, "account registered");
                    return Ok(account);
                }
                Err(VendingError::DuplicateId(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(VendingError::Conflict(
            "could not allocate an account id".to_string(),
        ))
    }

    /// Checks that `caller` may act on the account `target`.
    async fn authorize(&self, caller: &AccountId, target: &AccountId) -> Result<()> {
        if caller == target {
            return Ok(());
        }
        let account = self.ledger.account(caller).await?;
        if account.is_admin() {
            Ok(())
        } else {
            Err(VendingError::Forbidden(
                "cannot access another user's account".to_string(),
            ))
        }
    }

    pub async fn get_account(&self, caller: &AccountId, id: &AccountId) -> Result<Account> {
        self.authorize(caller, id).await?;
        self.ledger.account(id).await
    }

    pub async fn list_accounts(
        &self,
        caller: &AccountId,
        name: Option<&str>,
    ) -> Result<Vec<Account>> {
        self.ledger.account(caller).await?.require_role(Role::Admin)?;
        match name {
            Some(name) => self.ledger.accounts().list(&|a: &Account| a.name == name).await,
            None => self.ledger.accounts().list(&|_| true).await,
        }
    }

    #[instrument(skip(self, caller, id, password), fields(account = %id))]
    pub async fn change_password(
        &self,
        caller: &AccountId,
        id: &AccountId,
        password: &str,
    ) -> Result<()> {
        require_password(password)?;
        self.authorize(caller, id).await?;

        let password_hash = self.hasher.hash(password)?;
        let _guard = self.ledger.lock_account(id).await;
        let mut account = self.ledger.account(id).await?;
        account.password_hash = password_hash;
        self.ledger.accounts().put(account).await?;

        info!("password changed");
        Ok(())
    }

    /// Removes an account. A seller still owning products cannot be removed.
    #[instrument(skip(self, caller, id), fields(account = %id))]
    pub async fn delete_account(&self, caller: &AccountId, id: &AccountId) -> Result<()> {
        self.authorize(caller, id).await?;

        let _guard = self.ledger.lock_account(id).await;
        let account = self.ledger.account(id).await?;
        if account.role == Role::Seller {
            let owned = self
                .ledger
                .products()
                .list(&|p: &Product| p.is_owned_by(id))
                .await?;
            if !owned.is_empty() {
                return Err(VendingError::Conflict(format!(
                    "seller still owns {} product(s)",
                    owned.len()
                )));
            }
        }
        self.ledger.accounts().delete(id).await?;

        info!("account deleted");
        Ok(())
    }
}
