use crate::auth::endpoint::TokenEndpoint;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use dialoguer::Input;
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge};
use tiny_http::{Response, Server};
use tracing::{debug, instrument};
use url::Url;

const LOOPBACK_BIND_ADDR: &str = "127.0.0.1:0";
const PASTE_REDIRECT_URI: &str = "http://localhost";
const SUCCESS_PAGE: &str = "The authentication flow has completed. You may close this window.";
const FAILURE_PAGE: &str = "Authorization failed. You may close this window.";

/// Everything a presenter needs to send the user to the consent screen
pub struct ConsentPrompt<'a> {
    endpoint: &'a dyn TokenEndpoint,
    scopes: &'a [String],
    pkce_challenge: &'a PkceCodeChallenge,
}

impl<'a> ConsentPrompt<'a> {
    pub(crate) fn new(
        endpoint: &'a dyn TokenEndpoint,
        scopes: &'a [String],
        pkce_challenge: &'a PkceCodeChallenge,
    ) -> Self {
        Self {
            endpoint,
            scopes,
            pkce_challenge,
        }
    }

    /// Consent URL that redirects back to `redirect_uri`, plus the state
    /// value the callback must echo
    pub fn url(&self, redirect_uri: &str) -> Result<(Url, CsrfToken)> {
        self.endpoint
            .authorization_url(redirect_uri, self.scopes, self.pkce_challenge)
    }
}

/// An authorization code together with the redirect URI it was issued for
#[derive(Debug)]
pub struct AuthorizationGrant {
    pub code: AuthorizationCode,
    pub redirect_uri: String,
}

/// Obtains user consent and hands back an authorization code
#[async_trait]
pub trait AuthorizationPresenter: Send + Sync {
    async fn present(&self, prompt: ConsentPrompt<'_>) -> Result<AuthorizationGrant>;
}

#[async_trait]
impl<P: AuthorizationPresenter + ?Sized> AuthorizationPresenter for Box<P> {
    async fn present(&self, prompt: ConsentPrompt<'_>) -> Result<AuthorizationGrant> {
        (**self).present(prompt).await
    }
}

/// Receives the browser redirect on a loopback port chosen by the OS
pub struct LocalServerPresenter;

#[async_trait]
impl AuthorizationPresenter for LocalServerPresenter {
    #[instrument(name = "Waiting for browser consent", skip_all)]
    async fn present(&self, prompt: ConsentPrompt<'_>) -> Result<AuthorizationGrant> {
        let server = Server::http(LOOPBACK_BIND_ADDR).map_err(|e| {
            AppError::Auth(format!("Failed to bind to {}: {}", LOOPBACK_BIND_ADDR, e))
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| AppError::Auth("Loopback listener has no IP address".to_string()))?;

        let redirect_uri = loopback_redirect_uri(port);
        let (auth_url, csrf_token) = prompt.url(&redirect_uri)?;

        println!("Open this URL in your browser:\n{}", auth_url);
        println!();
        println!("Waiting for authorization...");

        let callback_base = redirect_uri.clone();
        let code = tokio::task::spawn_blocking(move || {
            receive_callback(&server, &callback_base, &csrf_token)
        })
        .await
        .map_err(|e| AppError::Other(e.into()))??;

        Ok(AuthorizationGrant { code, redirect_uri })
    }
}

/// Redirect target on the same address the listener is bound to, so name
/// resolution of `localhost` cannot send the browser elsewhere
fn loopback_redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}/", port)
}

/// Serve requests until one carries an OAuth callback, answer the browser,
/// and return the parsed result
fn receive_callback(
    server: &Server,
    callback_base: &str,
    csrf_token: &CsrfToken,
) -> Result<AuthorizationCode> {
    loop {
        let request = server
            .recv()
            .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))?;

        let url = Url::parse(callback_base)
            .and_then(|base| base.join(request.url()))
            .map_err(|e| AppError::Auth(format!("Failed to parse callback URL: {}", e)))?;

        if !is_callback(&url) {
            debug!(path = url.path(), "Ignoring non-callback request");
            // Browser noise such as /favicon.ico
            let _ = request.respond(Response::from_string("Not found").with_status_code(404));
            continue;
        }

        let result = parse_callback(&url, csrf_token);
        let page = match result {
            Ok(_) => SUCCESS_PAGE,
            Err(_) => FAILURE_PAGE,
        };
        request
            .respond(Response::from_string(page))
            .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))?;

        return result;
    }
}

fn is_callback(url: &Url) -> bool {
    url.query_pairs()
        .any(|(key, _)| key == "code" || key == "error" || key == "state")
}

/// Extract the authorization code from a redirect URL, rejecting denied
/// consent and mismatched state
pub(crate) fn parse_callback(url: &Url, csrf_token: &CsrfToken) -> Result<AuthorizationCode> {
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        return Err(AppError::Auth(format!(
            "Authorization was cancelled or denied: {}",
            error
        )));
    }

    let state = param("state").ok_or_else(|| AppError::Auth("No state in callback".to_string()))?;
    if state != *csrf_token.secret() {
        return Err(AppError::Auth("CSRF token mismatch".to_string()));
    }

    let code = param("code").ok_or_else(|| AppError::Auth("No code in callback".to_string()))?;

    Ok(AuthorizationCode::new(code))
}

/// For hosts without a browser: the user completes consent elsewhere and
/// pastes the URL the browser ended up on
pub struct PastePresenter;

#[async_trait]
impl AuthorizationPresenter for PastePresenter {
    async fn present(&self, prompt: ConsentPrompt<'_>) -> Result<AuthorizationGrant> {
        let (auth_url, csrf_token) = prompt.url(PASTE_REDIRECT_URI)?;

        println!("Open this URL in a browser on any machine:\n{}", auth_url);
        println!();
        println!("After approving, the browser is sent to a localhost page that fails to load.");

        let pasted = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt("Paste the full URL from the browser's address bar")
                .interact_text()
        })
        .await
        .map_err(|e| AppError::Other(e.into()))?
        .map_err(|e| AppError::Auth(format!("Failed to read pasted URL: {}", e)))?;

        let url = Url::parse(pasted.trim())
            .map_err(|e| AppError::Auth(format!("Failed to parse pasted URL: {}", e)))?;
        let code = parse_callback(&url, &csrf_token)?;

        Ok(AuthorizationGrant {
            code,
            redirect_uri: PASTE_REDIRECT_URI.to_string(),
        })
    }
}

/// Refuses interactive consent; for deployments where the credential file
/// is provisioned ahead of time
pub struct NonInteractivePresenter;

#[async_trait]
impl AuthorizationPresenter for NonInteractivePresenter {
    async fn present(&self, _prompt: ConsentPrompt<'_>) -> Result<AuthorizationGrant> {
        Err(AppError::Auth(
            "Interactive authorization is disabled and no usable credential is cached".to_string(),
        ))
    }
}
