use crate::auth::CredentialManager;
use crate::config::Config;
use crate::error::Result;
use tracing::info;

pub async fn execute(reset: bool) -> Result<()> {
    let config = Config::load()?;
    let manager = CredentialManager::from_config(&config.google)?;

    if reset {
        manager.clear()?;
    }

    let credential = manager.obtain().await?;

    info!(expires_at = %credential.expires_at, "Google authentication verified");

    Ok(())
}
