//! Stores or reads a named secret (default: the hosting API token).
//!
//! ```text
//! echo "$TOKEN" | STOREFRONT_ENV=production store_secret save [name]
//! STOREFRONT_ENV=production store_secret check [name]
//! ```
//!
//! The key comes from `<NAME>_ENCRYPTION_KEY_<ENV>`; every access is audited.

use anyhow::{bail, Context, Result};
use std::io::Read;
use storefront::config::{Environment, SecretStoreConfig, StorefrontConfig};
use storefront::credentials::SecretManager;
use tracing::info;

const DEFAULT_SECRET_NAME: &str = "hosting";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,store_secret=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();
    let name = args.next().unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string());

    let environment = Environment::from_env();
    let config = StorefrontConfig::load().context("Failed to load configuration")?;
    let manager = SecretManager::new(SecretStoreConfig::for_environment(
        environment,
        &config.storage.base_path,
        &name,
    ));

    match command.as_str() {
        "save" => {
            let mut secret = String::new();
            std::io::stdin()
                .read_to_string(&mut secret)
                .context("Failed to read secret from stdin")?;
            let secret = secret.trim();
            if secret.is_empty() {
                bail!("No secret provided on stdin");
            }

            manager.save_secret(secret).await?;
            info!(
                name = %name,
                environment = environment.suffix(),
                path = %manager.config().storage_path.display(),
                "Secret stored"
            );
        }
        "check" => match manager.get_secret().await? {
            Some(_) => info!(name = %name, environment = environment.suffix(), "Secret present"),
            None => info!(name = %name, environment = environment.suffix(), "Secret not stored"),
        },
        _ => bail!("Usage: store_secret <save|check> [name]"),
    }

    Ok(())
}
