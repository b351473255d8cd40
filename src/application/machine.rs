use super::catalog::Catalog;
use super::credentials::{CredentialSigner, PasswordHasher};
use super::directory::AccountDirectory;
use super::engine::VendingEngine;
use super::ledger::Ledger;
use super::session::SessionManager;
use crate::config::MachineConfig;
use crate::domain::account::Account;
use crate::domain::ports::{AccountStoreRef, ClockRef, ProductStoreRef};
use crate::error::Result;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::in_memory::{InMemoryAccountStore, InMemoryProductStore};
use std::sync::Arc;
use tracing::warn;

/// The services of one vending machine, sharing a single ledger.
pub struct VendingMachine {
    ledger: Ledger,
    sessions: SessionManager,
    engine: VendingEngine,
    catalog: Catalog,
    directory: AccountDirectory,
}

impl VendingMachine {
    pub fn new(
        config: &MachineConfig,
        accounts: AccountStoreRef,
        products: ProductStoreRef,
        clock: ClockRef,
    ) -> Result<Self> {
        config.validate()?;

        let ledger = Ledger::new(accounts, products);
        let hasher = Arc::new(PasswordHasher::new(
            config.hash_memory_kib,
            config.hash_iterations,
        )?);
        let signer = match &config.signing_secret {
            Some(secret) => CredentialSigner::new(secret.as_bytes()),
            None => {
                warn!("no signing secret configured, credentials will not survive a restart");
                CredentialSigner::random()
            }
        };

        Ok(Self {
            sessions: SessionManager::new(
                ledger.clone(),
                hasher.clone(),
                signer,
                clock,
                config.session_ttl_millis(),
            ),
            engine: VendingEngine::new(ledger.clone()),
            catalog: Catalog::new(ledger.clone()),
            directory: AccountDirectory::new(ledger.clone(), hasher),
            ledger,
        })
    }

    /// A machine over fresh in-memory stores and the system clock.
    pub fn in_memory(config: &MachineConfig) -> Result<Self> {
        Self::new(
            config,
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryProductStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Creates the configured admin account, if any.
    pub async fn bootstrap(&self, config: &MachineConfig) -> Result<Option<Account>> {
        match config.admin_credentials() {
            Some((name, password)) => self
                .directory
                .bootstrap_admin(name, password)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn engine(&self) -> &VendingEngine {
        &self.engine
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn directory(&self) -> &AccountDirectory {
        &self.directory
    }
}
