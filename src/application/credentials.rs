//! Password hashing and the signed bearer credential handed out at login.
//!
//! A credential has the shape `<account id>.<token>.<expires at>.<signature>`
//! where the signature is a hex HMAC-SHA256 over the first three fields. A
//! valid signature only proves the server minted the value; the session
//! manager still compares the claims against the account's stored session.

use crate::domain::account::AccountId;
use crate::error::{Result, VendingError};
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Salted argon2id password hashing.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| VendingError::InvalidInput(format!("argon2 parameters: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| VendingError::InvalidInput(format!("cannot hash password: {e}")))
    }

    pub fn verify(&self, password: &str, password_hash: &str) -> bool {
        PasswordHash::new(password_hash)
            .map(|parsed| {
                self.argon2
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Claims carried by a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub account_id: AccountId,
    pub token: String,
    pub expires_at: i64,
}

impl SessionClaims {
    fn payload(&self) -> String {
        format!("{}.{}.{}", self.account_id, self.token, self.expires_at)
    }
}

/// Signs and verifies bearer credentials with a server-held key.
pub struct CredentialSigner {
    key: Vec<u8>,
}

impl CredentialSigner {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// A signer with a fresh random key; credentials do not survive a restart.
    pub fn random() -> Self {
        let key: [u8; 32] = rand::random();
        Self::new(key.to_vec())
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|_| VendingError::InvalidInput("invalid signing key".to_string()))
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String> {
        let payload = claims.payload();
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Decodes a credential, failing with `Unauthorized` on any malformed or
    /// forged input.
    pub fn verify(&self, credential: &str) -> Result<SessionClaims> {
        // Split from the right so the account id may itself contain dots.
        let mut parts = credential.rsplitn(4, '.');
        let (Some(signature), Some(expires_at), Some(token), Some(account_id)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VendingError::Unauthorized);
        };
        if account_id.is_empty() || token.is_empty() {
            return Err(VendingError::Unauthorized);
        }
        let signature = hex::decode(signature).map_err(|_| VendingError::Unauthorized)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| VendingError::Unauthorized)?;

        let claims = SessionClaims {
            account_id: AccountId::from(account_id),
            token: token.to_string(),
            expires_at,
        };
        let mut mac = self.mac()?;
        mac.update(claims.payload().as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| VendingError::Unauthorized)?;
        Ok(claims)
    }
}
