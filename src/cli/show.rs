use crate::config::Config;
use crate::error::Result;
use clap::Subcommand;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show configuration, client secret and token paths
    Paths,
}

impl ShowResource {
    pub async fn execute(&self) -> Result<()> {
        match self {
            ShowResource::Paths => show_paths(),
        }
    }
}

fn show_paths() -> Result<()> {
    let config_path = Config::config_file()?;
    let cache_dir = Config::cache_dir()?;
    let config = Config::load()?;

    info!(path = ?config_path, "Config path");
    info!(path = ?config.google.client_secret_file()?, "Client secret path");
    info!(path = ?config.google.token_file()?, "Token path");
    info!(path = ?cache_dir, "Cache path");

    Ok(())
}
