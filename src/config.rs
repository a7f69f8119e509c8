use crate::error::{AppError, Result};
use crate::sheets::AUTH_SCOPE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const CONFIG_DIR_PREFIX: &str = "sheet-export";
const CLIENT_SECRET_FILE: &str = "client_secret.json";
const TOKEN_FILE: &str = "google_token.json";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub google: GoogleConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth client JSON downloaded from the Google Cloud console
    pub client_secret_file: Option<PathBuf>,
    /// Where the access/refresh token pair is cached
    pub token_file: Option<PathBuf>,
    pub scopes: Vec<String>,
    pub presenter: PresenterKind,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_secret_file: None,
            token_file: None,
            scopes: vec![AUTH_SCOPE.as_ref().to_string()],
            presenter: PresenterKind::default(),
        }
    }
}

impl GoogleConfig {
    pub fn client_secret_file(&self) -> Result<PathBuf> {
        match &self.client_secret_file {
            Some(path) => Ok(path.clone()),
            None => Config::config_path(CLIENT_SECRET_FILE),
        }
    }

    pub fn token_file(&self) -> Result<PathBuf> {
        match &self.token_file {
            Some(path) => Ok(path.clone()),
            None => Config::cache_file(TOKEN_FILE),
        }
    }
}

/// How user consent is captured when no usable credential is cached
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PresenterKind {
    /// Loopback HTTP listener receives the browser redirect
    #[default]
    LocalServer,
    /// The user pastes the redirected URL back into the terminal
    Paste,
    /// Never prompt; credentials must be provisioned beforehand
    None,
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file()?;

        if !config_path.exists() {
            debug!(path = ?config_path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        if config.google.scopes.is_empty() {
            return Err(AppError::Config(
                "At least one Google scope must be set in config file".to_string(),
            ));
        }

        if config.google.scopes.iter().any(|scope| scope.trim().is_empty()) {
            return Err(AppError::Config(
                "Google scopes must not be empty strings".to_string(),
            ));
        }

        Ok(config)
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Self::config_path("config.toml")
    }

    /// Get a path inside the config directory
    pub fn config_path(filename: &str) -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file(filename)
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }

    /// Get the cache directory path
    pub fn cache_dir() -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.get_cache_home()
            .ok_or_else(|| AppError::Config("Failed to determine cache directory".to_string()))
    }

    /// Get a cache file path
    pub fn cache_file(filename: &str) -> Result<PathBuf> {
        let xdg = Self::xdg_dirs();
        xdg.place_cache_file(filename)
            .map_err(|e| AppError::Config(format!("Failed to create cache file path: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            google: GoogleConfig {
                client_secret_file: Some(PathBuf::from("/etc/sheet-export/secret.json")),
                token_file: None,
                scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
                presenter: PresenterKind::Paste,
            },
        };

        let serialized = toml::to_string(&config).unwrap();
        let deserialized = Config::parse(&serialized).unwrap();

        assert_eq!(
            config.google.client_secret_file,
            deserialized.google.client_secret_file
        );
        assert_eq!(config.google.scopes, deserialized.google.scopes);
        assert_eq!(deserialized.google.presenter, PresenterKind::Paste);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(
            config.google.scopes,
            vec!["https://www.googleapis.com/auth/spreadsheets".to_string()]
        );
        assert_eq!(config.google.presenter, PresenterKind::LocalServer);
        assert!(config.google.client_secret_file.is_none());
        assert!(config.google.token_file.is_none());
    }

    #[test]
    fn test_presenter_kebab_case() {
        let config = Config::parse("[google]\npresenter = \"none\"\n").unwrap();
        assert_eq!(config.google.presenter, PresenterKind::None);

        let config = Config::parse("[google]\npresenter = \"local-server\"\n").unwrap();
        assert_eq!(config.google.presenter, PresenterKind::LocalServer);
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let err = Config::parse("[google]\nscopes = []\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = Config::parse("[google]\nscopes = [\" \"]\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = Config::parse(
            "[google]\nclient_secret_file = \"/tmp/secret.json\"\ntoken_file = \"/tmp/token.json\"\n",
        )
        .unwrap();

        assert_eq!(
            config.google.client_secret_file().unwrap(),
            PathBuf::from("/tmp/secret.json")
        );
        assert_eq!(
            config.google.token_file().unwrap(),
            PathBuf::from("/tmp/token.json")
        );
    }
}
