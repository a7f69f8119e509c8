use crate::auth::presenter::AuthorizationGrant;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use oauth2::{
    AuthUrl, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, TokenResponse, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse,
    },
};
use reqwest::redirect::Policy;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use yup_oauth2::ApplicationSecret;

/// Token material returned by the authorization server
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
    pub scopes: Option<Vec<String>>,
}

impl From<BasicTokenResponse> for TokenGrant {
    fn from(response: BasicTokenResponse) -> Self {
        TokenGrant {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in(),
            scopes: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.as_str().to_owned()).collect()),
        }
    }
}

/// The OAuth2 authorization server
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Build the consent URL the user must visit for `redirect_uri`
    fn authorization_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        pkce_challenge: &PkceCodeChallenge,
    ) -> Result<(Url, CsrfToken)>;

    async fn exchange_code(
        &self,
        grant: AuthorizationGrant,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// Google's token endpoint, configured from a client secret file.
///
/// The secret file is only read the first time the endpoint is used, so a
/// cached credential never requires it.
pub struct GoogleTokenEndpoint {
    secret_path: PathBuf,
    client: OnceLock<ConfiguredClient>,
    http_client: reqwest::Client,
}

impl GoogleTokenEndpoint {
    pub fn new(secret_path: impl Into<PathBuf>) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            secret_path: secret_path.into(),
            client: OnceLock::new(),
            http_client,
        })
    }

    fn client(&self) -> Result<&ConfiguredClient> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let secret = load_secret(&self.secret_path)?;
        let client = build_client(secret)?;
        Ok(self.client.get_or_init(|| client))
    }
}

fn load_secret(path: &Path) -> Result<ApplicationSecret> {
    debug!(path = ?path, "Reading OAuth client secret");

    let contents = fs::read(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to read client secret file {:?}: {}",
            path, e
        ))
    })?;

    yup_oauth2::parse_application_secret(contents)
        .map_err(|e| AppError::Config(format!("Invalid client secret file {:?}: {}", path, e)))
}

fn build_client(secret: ApplicationSecret) -> Result<ConfiguredClient> {
    let auth_url = AuthUrl::new(secret.auth_uri)
        .map_err(|e| AppError::Auth(format!("Invalid auth URL: {}", e)))?;
    let token_url = TokenUrl::new(secret.token_uri)
        .map_err(|e| AppError::Auth(format!("Invalid token URL: {}", e)))?;

    let client = BasicClient::new(ClientId::new(secret.client_id))
        .set_client_secret(ClientSecret::new(secret.client_secret))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url);

    Ok(client)
}

fn redirect_url(redirect_uri: &str) -> Result<RedirectUrl> {
    RedirectUrl::new(redirect_uri.to_string())
        .map_err(|e| AppError::Auth(format!("Invalid redirect URL: {}", e)))
}

#[async_trait]
impl TokenEndpoint for GoogleTokenEndpoint {
    fn authorization_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        pkce_challenge: &PkceCodeChallenge,
    ) -> Result<(Url, CsrfToken)> {
        let redirect_url = redirect_url(redirect_uri)?;

        let (auth_url, csrf_token) = self
            .client()?
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge.clone())
            .set_redirect_uri(Cow::Owned(redirect_url))
            // Without offline access Google issues no refresh token
            .add_extra_param("access_type", "offline")
            .url();

        Ok((auth_url, csrf_token))
    }

    #[instrument(name = "Exchanging authorization code", skip_all)]
    async fn exchange_code(
        &self,
        grant: AuthorizationGrant,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<TokenGrant> {
        let redirect_url = redirect_url(&grant.redirect_uri)?;

        let token_result = self
            .client()?
            .exchange_code(grant.code)
            .set_pkce_verifier(pkce_verifier)
            .set_redirect_uri(Cow::Owned(redirect_url))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to exchange code: {:?}", e)))?;

        Ok(token_result.into())
    }

    #[instrument(name = "Refreshing access token", skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let token_result = self
            .client()?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to refresh token: {:?}", e)))?;

        Ok(token_result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALLED_SECRET: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "sheet-export",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    fn endpoint_with_secret(contents: &str) -> (tempfile::TempDir, GoogleTokenEndpoint) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        fs::write(&path, contents).unwrap();
        let endpoint = GoogleTokenEndpoint::new(&path).unwrap();
        (dir, endpoint)
    }

    #[test]
    fn test_authorization_url_parameters() {
        let (_dir, endpoint) = endpoint_with_secret(INSTALLED_SECRET);
        let (challenge, _verifier) = PkceCodeChallenge::new_random_sha256();
        let scopes = vec!["https://www.googleapis.com/auth/spreadsheets".to_string()];

        let (url, csrf_token) = endpoint
            .authorization_url("http://localhost:8123/", &scopes, &challenge)
            .unwrap();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };
        assert_eq!(param("client_id").as_deref(), Some("123.apps.googleusercontent.com"));
        assert_eq!(param("redirect_uri").as_deref(), Some("http://localhost:8123/"));
        assert_eq!(param("scope"), Some(scopes[0].clone()));
        assert_eq!(param("access_type").as_deref(), Some("offline"));
        assert_eq!(param("state").as_deref(), Some(csrf_token.secret().as_str()));
        assert_eq!(param("code_challenge_method").as_deref(), Some("S256"));
    }

    #[test]
    fn test_missing_secret_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = GoogleTokenEndpoint::new(dir.path().join("absent.json")).unwrap();
        let (challenge, _verifier) = PkceCodeChallenge::new_random_sha256();

        let err = endpoint
            .authorization_url("http://localhost/", &[], &challenge)
            .unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_malformed_secret_file_is_config_error() {
        let (_dir, endpoint) = endpoint_with_secret(r#"{"other": {}}"#);
        let (challenge, _verifier) = PkceCodeChallenge::new_random_sha256();

        let err = endpoint
            .authorization_url("http://localhost/", &[], &challenge)
            .unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
    }
}
