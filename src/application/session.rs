use super::credentials::{CredentialSigner, PasswordHasher, SessionClaims};
use super::ledger::Ledger;
use crate::domain::account::{Account, AccountId, Session};
use crate::domain::ports::ClockRef;
use crate::error::{Result, VendingError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginGrant {
    pub account_id: AccountId,
    /// Raw session nonce stored on the account.
    #[serde(skip_serializing)]
    pub token: String,
    /// Signed bearer value to present on later calls.
    pub credential: String,
    /// Absolute expiry in epoch milliseconds.
    pub expires_at: i64,
}

/// Issues, validates and revokes session credentials. An account holds at
/// most one active session; a second login is refused until the first one
/// is logged out or has expired.
pub struct SessionManager {
    ledger: Ledger,
    hasher: Arc<PasswordHasher>,
    signer: CredentialSigner,
    clock: ClockRef,
    ttl_millis: i64,
}

impl SessionManager {
    pub fn new(
        ledger: Ledger,
        hasher: Arc<PasswordHasher>,
        signer: CredentialSigner,
        clock: ClockRef,
        ttl_millis: i64,
    ) -> Self {
        Self {
            ledger,
            hasher,
            signer,
            clock,
            ttl_millis,
        }
    }

    /// Looks an account up by name and checks its password. Unknown names and
    /// wrong passwords are indistinguishable.
    async fn authenticate(&self, name: &str, password: &str) -> Result<Account> {
        match self.ledger.accounts().find_by_name(name).await? {
            Some(account) if self.hasher.verify(password, &account.password_hash) => Ok(account),
            _ => Err(VendingError::NotFound("user".to_string())),
        }
    }

    pub async fn login(&self, name: &str, password: &str) -> Result<LoginGrant> {
        let candidate = self.authenticate(name, password).await?;
        self.open_session(candidate).await
    }

    /// Starts a session for an account whose password was checked against
    /// `candidate`. Fails like a bad password if the stored hash changed since.
    async fn open_session(&self, candidate: Account) -> Result<LoginGrant> {
        let _guard = self.ledger.lock_account(&candidate.id).await;
        let mut account = match self.ledger.accounts().get(&candidate.id).await? {
            Some(account) if account.password_hash == candidate.password_hash => account,
            _ => return Err(VendingError::NotFound("user".to_string())),
        };

        let now = self.clock.now_millis();
        if account.has_active_session(now) {
            warn!(account = %account.id, "login refused, session already active");
            return Err(VendingError::ActiveSessionExists);
        }

        let claims = SessionClaims {
            account_id: account.id.clone(),
            token: Uuid::new_v4().simple().to_string(),
            expires_at: now.saturating_add(self.ttl_millis),
        };
        let credential = self.signer.sign(&claims)?;

        account.attach_session(Session {
            token: claims.token.clone(),
            expires_at: claims.expires_at,
        });
        self.ledger.accounts().put(account).await?;

        info!(account = %claims.account_id, expires_at = claims.expires_at, "session opened");
        Ok(LoginGrant {
            account_id: claims.account_id,
            token: claims.token,
            credential,
            expires_at: claims.expires_at,
        })
    }

    /// Resolves a presented credential to the account it was issued to.
    ///
    /// The decoded token and expiry must equal the stored session exactly and
    /// the session must not have expired; a later login therefore invalidates
    /// any earlier credential.
    pub async fn validate(&self, credential: &str) -> Result<AccountId> {
        let now = self.clock.now_millis();
        let claims = self.signer.verify(credential)?;
        if claims.expires_at < now {
            debug!(account = %claims.account_id, "credential expired");
            return Err(VendingError::Unauthorized);
        }

        let account = self
            .ledger
            .accounts()
            .get(&claims.account_id)
            .await?
            .ok_or(VendingError::Unauthorized)?;
        match &account.session {
            Some(session)
                if session.token == claims.token && session.expires_at == claims.expires_at =>
            {
                Ok(account.id)
            }
            _ => {
                debug!(account = %account.id, "credential does not match stored session");
                Err(VendingError::Unauthorized)
            }
        }
    }

    /// Clears the account's session. Always succeeds, including when no
    /// session was active or the account no longer exists.
    pub async fn logout(&self, id: &AccountId) -> Result<()> {
        let _guard = self.ledger.lock_account(id).await;
        let Some(mut account) = self.ledger.accounts().get(id).await? else {
            return Ok(());
        };
        if account.session.is_some() {
            account.clear_session();
            self.ledger.accounts().put(account).await?;
            info!(account = %id, "session closed");
        }
        Ok(())
    }

    /// Clears the account's session after checking name and password, for
    /// when no live credential is at hand.
    pub async fn logout_by_credentials(&self, name: &str, password: &str) -> Result<()> {
        let account = self.authenticate(name, password).await?;
        self.logout(&account.id).await
    }
}
