use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::credentials::SecretError;

/// Deployment environment tag. Selects per-environment secret paths and key variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Reads `STOREFRONT_ENV`, defaulting to development when unset or unknown.
    pub fn from_env() -> Self {
        match std::env::var("STOREFRONT_ENV") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %value, "Unknown STOREFRONT_ENV, using development");
                Self::Development
            }),
            Err(_) => Self::Development,
        }
    }

    /// Short tag used in file names and key variable names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Staging => "staging",
            Self::Production => "prod",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Where one secret store keeps its file, key variable and audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretStoreConfig {
    pub storage_path: PathBuf,
    pub key_env_var: String,
    pub audit_log_path: PathBuf,
}

impl SecretStoreConfig {
    /// Layout for store `name` under `base_path`:
    ///
    /// - `<base>/secure/<name>_<env>.enc`
    /// - `<NAME>_ENCRYPTION_KEY_<ENV>`
    /// - `<base>/secure/<name>_audit_<env>.log`
    pub fn for_environment(env: Environment, base_path: &Path, name: &str) -> Self {
        let suffix = env.suffix();
        let secure_dir = base_path.join("secure");
        Self {
            storage_path: secure_dir.join(format!("{}_{}.enc", name, suffix)),
            key_env_var: format!(
                "{}_ENCRYPTION_KEY_{}",
                name.to_uppercase(),
                suffix.to_uppercase()
            ),
            audit_log_path: secure_dir.join(format!("{}_audit_{}.log", name, suffix)),
        }
    }

    /// Reads the master key from `key_env_var`. An unset or empty variable is fatal.
    pub fn encryption_key(&self) -> Result<String, SecretError> {
        match std::env::var(&self.key_env_var) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(SecretError::MissingEncryptionKey(self.key_env_var.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("Staging".parse::<Environment>(), Ok(Environment::Staging));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_per_environment_layout() {
        let base = Path::new("/srv/storefront");
        let dev = SecretStoreConfig::for_environment(Environment::Development, base, "hosting");
        let prod = SecretStoreConfig::for_environment(Environment::Production, base, "hosting");

        assert_eq!(dev.storage_path, PathBuf::from("/srv/storefront/secure/hosting_dev.enc"));
        assert_eq!(dev.key_env_var, "HOSTING_ENCRYPTION_KEY_DEV");
        assert_eq!(prod.key_env_var, "HOSTING_ENCRYPTION_KEY_PROD");
        assert_eq!(
            prod.audit_log_path,
            PathBuf::from("/srv/storefront/secure/hosting_audit_prod.log")
        );
        assert_ne!(dev.storage_path, prod.storage_path);
    }

    #[test]
    fn test_missing_key_variable() {
        let config = SecretStoreConfig {
            storage_path: PathBuf::from("x.enc"),
            key_env_var: "STOREFRONT_TEST_NEVER_SET_KEY".to_string(),
            audit_log_path: PathBuf::from("x.log"),
        };

        assert!(matches!(
            config.encryption_key(),
            Err(SecretError::MissingEncryptionKey(var)) if var == "STOREFRONT_TEST_NEVER_SET_KEY"
        ));
    }
}
