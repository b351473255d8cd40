//! Machine configuration.
//!
//! Every setting is a CLI flag with an environment-variable fallback, so the
//! same struct is flattened into the binary's `Cli` and built directly by
//! embedders and tests.

use clap::Args;

pub const DEFAULT_SESSION_TTL_DAYS: u32 = 30;
/// argon2 recommended memory cost (19 MiB).
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;
pub const DEFAULT_HASH_ITERATIONS: u32 = 2;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Args)]
pub struct MachineConfig {
    /// Lifetime of a login session in days.
    #[arg(long, env = "VENDING_SESSION_TTL_DAYS", default_value_t = DEFAULT_SESSION_TTL_DAYS)]
    pub session_ttl_days: u32,

    /// Key used to sign bearer credentials. A random key is generated when absent.
    #[arg(long, env = "VENDING_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: Option<String>,

    /// argon2 memory cost in KiB.
    #[arg(long, env = "VENDING_HASH_MEMORY_KIB", default_value_t = DEFAULT_HASH_MEMORY_KIB)]
    pub hash_memory_kib: u32,

    /// argon2 iteration count.
    #[arg(long, env = "VENDING_HASH_ITERATIONS", default_value_t = DEFAULT_HASH_ITERATIONS)]
    pub hash_iterations: u32,

    /// Name of the admin account created at startup.
    #[arg(long, env = "VENDING_ADMIN_NAME", requires = "admin_password")]
    pub admin_name: Option<String>,

    /// Password of the admin account created at startup.
    #[arg(long, env = "VENDING_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            signing_secret: None,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            admin_name: None,
            admin_password: None,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_days == 0 {
            return Err(ConfigError::InvalidValue("session_ttl_days".to_string()));
        }
        if self.hash_iterations == 0 {
            return Err(ConfigError::InvalidValue("hash_iterations".to_string()));
        }
        // argon2 requires at least 8 KiB per lane; a single lane is used.
        if self.hash_memory_kib < 8 {
            return Err(ConfigError::InvalidValue("hash_memory_kib".to_string()));
        }
        if matches!(&self.signing_secret, Some(secret) if secret.is_empty()) {
            return Err(ConfigError::InvalidValue("signing_secret".to_string()));
        }
        match (&self.admin_name, &self.admin_password) {
            (Some(_), None) => Err(ConfigError::MissingRequired("admin_password".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingRequired("admin_name".to_string())),
            _ => Ok(()),
        }
    }

    pub fn session_ttl_millis(&self) -> i64 {
        i64::from(self.session_ttl_days) * MILLIS_PER_DAY
    }

    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_name, &self.admin_password) {
            (Some(name), Some(password)) => Some((name, password)),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MachineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_ttl_millis(), 30 * 24 * 60 * 60 * 1000);
        assert!(config.admin_credentials().is_none());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let config = MachineConfig {
            session_ttl_days: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(field)) if field == "session_ttl_days"
        ));
    }

    #[test]
    fn test_rejects_half_admin_pair() {
        let config = MachineConfig {
            admin_name: Some("root".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_rejects_tiny_hash_memory() {
        let config = MachineConfig {
            hash_memory_kib: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
