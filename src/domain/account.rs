use super::coin::{Balance, Coin};
use crate::error::{Result, VendingError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, store-unique account identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = VendingError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(VendingError::InvalidInput(format!(
                "unsupported user role {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side record of the single live session bound to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Random nonce minted at login.
    pub token: String,
    /// Absolute expiry in epoch milliseconds.
    pub expires_at: i64,
}

impl Session {
    pub fn is_active(&self, now: i64) -> bool {
        self.expires_at >= now
    }
}

/// A registered user of the machine.
///
/// `session` being `Some` is the only way to carry a token, so a token
/// without an expiry cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub deposit: Balance,
    #[serde(skip_serializing)]
    pub session: Option<Session>,
}

impl Account {
    pub fn new(id: AccountId, name: impl Into<String>, password_hash: String, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            password_hash,
            role,
            deposit: Balance::ZERO,
            session: None,
        }
    }

    pub fn require_role(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(VendingError::Forbidden(format!("user is not a {role}")))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Adds a coin to the deposit and returns the new balance.
    pub fn credit(&mut self, coin: Coin) -> Result<Balance> {
        self.deposit = self
            .deposit
            .checked_add(coin.into())
            .ok_or_else(|| VendingError::InvalidInput("deposit is too large".to_string()))?;
        Ok(self.deposit)
    }

    /// Empties the deposit and returns what it held.
    pub fn drain_deposit(&mut self) -> Balance {
        std::mem::take(&mut self.deposit)
    }

    pub fn has_active_session(&self, now: i64) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active(now))
    }

    pub fn attach_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn clear_session(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buyer() -> Account {
        Account::new(AccountId::from("b1"), "buyer1", "hash".into(), Role::Buyer)
    }

    #[test]
    fn test_new_account_is_empty() {
        let account = buyer();
        assert_eq!(account.deposit, Balance::ZERO);
        assert!(account.session.is_none());
    }

    #[test]
    fn test_credit_accumulates() {
        let mut account = buyer();
        account.credit(Coin::new(20).unwrap()).unwrap();
        let balance = account.credit(Coin::new(50).unwrap()).unwrap();
        assert_eq!(balance, Balance(70));
    }

    #[test]
    fn test_credit_rejects_overflow() {
        let mut account = buyer();
        account.deposit = Balance(u64::MAX);
        assert!(account.credit(Coin::new(5).unwrap()).is_err());
        assert_eq!(account.deposit, Balance(u64::MAX));
    }

    #[test]
    fn test_drain_deposit() {
        let mut account = buyer();
        account.deposit = Balance(35);
        assert_eq!(account.drain_deposit(), Balance(35));
        assert_eq!(account.deposit, Balance::ZERO);
    }

    #[test]
    fn test_session_activity_is_inclusive_of_expiry() {
        let mut account = buyer();
        account.attach_session(Session {
            token: "nonce".into(),
            expires_at: 1_000,
        });
        assert!(account.has_active_session(1_000));
        assert!(!account.has_active_session(1_001));
        account.clear_session();
        assert!(!account.has_active_session(0));
    }

    #[test]
    fn test_require_role() {
        let account = buyer();
        assert!(account.require_role(Role::Buyer).is_ok());
        assert!(matches!(
            account.require_role(Role::Seller),
            Err(VendingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("seller".parse::<Role>().unwrap(), Role::Seller);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let mut account = buyer();
        account.attach_session(Session {
            token: "nonce".into(),
            expires_at: 1,
        });
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("hash"));
        assert!(!json.contains("nonce"));
        assert!(json.contains("\"role\":\"buyer\""));
    }
}
