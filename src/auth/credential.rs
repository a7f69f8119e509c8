use crate::auth::endpoint::TokenGrant;
use crate::error::{AppError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Seconds before real expiry at which a token is treated as expired
const EXPIRY_MARGIN_SECS: i64 = 300;
/// Used when the token response carries no `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Build a credential from a token endpoint response.
    ///
    /// Scopes fall back to the requested ones when the server does not echo
    /// them, and the refresh token falls back to `previous_refresh_token`
    /// (refresh responses usually omit it).
    pub(crate) fn from_grant(
        grant: TokenGrant,
        requested_scopes: &[String],
        previous_refresh_token: Option<String>,
    ) -> Self {
        let now = Utc::now();
        // Out-of-range lifetimes from the server get the default instead
        let expires_at = grant
            .expires_in
            .and_then(|d| i64::try_from(d.as_secs()).ok())
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or_else(|| now + TimeDelta::seconds(DEFAULT_EXPIRES_IN_SECS));

        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.or(previous_refresh_token),
            expires_at,
            scopes: grant
                .scopes
                .unwrap_or_else(|| requested_scopes.to_vec()),
        }
    }

    /// Check if the access token is expired or about to expire
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now() + TimeDelta::seconds(EXPIRY_MARGIN_SECS)
    }

    /// Whether every requested scope was granted
    pub fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }

    pub fn is_valid(&self, scopes: &[String]) -> bool {
        !self.access_token.is_empty() && !self.is_expired() && self.covers(scopes)
    }
}

/// JSON file holding the cached credential
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached credential. A file that cannot be parsed is treated
    /// as absent so that re-authorization can replace it.
    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;

        match serde_json::from_str(&contents) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Ignoring unreadable credential file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Auth(format!("Failed to create token cache directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(credential)?;

        // Create file with owner-only permissions from the start to avoid race condition
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|e| AppError::Auth(format!("Failed to create tokens file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| AppError::Auth(format!("Failed to write tokens file: {}", e)))?;

        debug!(path = ?self.path, "Saved credential");

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("No Google tokens to clear");
            return Ok(());
        }

        fs::remove_file(&self.path)
            .map_err(|e| AppError::Auth(format!("Failed to delete tokens file: {}", e)))?;
        debug!(path = ?self.path, "Cleared Google cached tokens");

        Ok(())
    }
}
