use crate::auth::credential::{Credential, CredentialStore};
use crate::auth::endpoint::{GoogleTokenEndpoint, TokenEndpoint};
use crate::auth::presenter::{
    AuthorizationPresenter, ConsentPrompt, LocalServerPresenter, NonInteractivePresenter,
    PastePresenter,
};
use crate::config::{GoogleConfig, PresenterKind};
use crate::error::Result;
use oauth2::PkceCodeChallenge;
use tracing::{debug, instrument};

/// Obtains a usable credential for a fixed scope list, caching it on disk
pub struct CredentialManager<E, P> {
    endpoint: E,
    presenter: P,
    store: CredentialStore,
    scopes: Vec<String>,
}

impl CredentialManager<GoogleTokenEndpoint, Box<dyn AuthorizationPresenter>> {
    pub fn from_config(config: &GoogleConfig) -> Result<Self> {
        let endpoint = GoogleTokenEndpoint::new(config.client_secret_file()?)?;
        let presenter: Box<dyn AuthorizationPresenter> = match config.presenter {
            PresenterKind::LocalServer => Box::new(LocalServerPresenter),
            PresenterKind::Paste => Box::new(PastePresenter),
            PresenterKind::None => Box::new(NonInteractivePresenter),
        };
        let store = CredentialStore::new(config.token_file()?);

        Ok(Self::new(endpoint, presenter, store, config.scopes.clone()))
    }
}

impl<E, P> CredentialManager<E, P>
where
    E: TokenEndpoint,
    P: AuthorizationPresenter,
{
    pub fn new(endpoint: E, presenter: P, store: CredentialStore, scopes: Vec<String>) -> Self {
        Self {
            endpoint,
            presenter,
            store,
            scopes,
        }
    }

    /// Get a valid credential, refreshing or re-authorizing as needed.
    ///
    /// Any newly minted or refreshed credential is persisted before it is
    /// returned.
    #[instrument(name = "Authenticating to Google", skip_all)]
    pub async fn obtain(&self) -> Result<Credential> {
        let credential = match self.store.load()? {
            Some(cached) if cached.is_valid(&self.scopes) => {
                debug!("Using cached Google credential");
                return Ok(cached);
            }
            Some(cached) if !cached.covers(&self.scopes) => {
                debug!("Cached credential lacks requested scopes, re-authorizing...");
                self.authorize().await?
            }
            Some(Credential {
                refresh_token: Some(refresh_token),
                ..
            }) => {
                debug!("Access token expired, refreshing...");
                match self.refresh(refresh_token).await {
                    Ok(refreshed) => {
                        debug!("Token refresh successful");
                        refreshed
                    }
                    Err(e) => {
                        debug!("Token refresh failed ({}), re-authorizing...", e);
                        self.authorize().await?
                    }
                }
            }
            Some(_) => {
                debug!("Cached credential has no refresh token, re-authorizing...");
                self.authorize().await?
            }
            None => {
                debug!(path = ?self.store.path(), "No cached credential found, authorizing...");
                self.authorize().await?
            }
        };

        self.store.save(&credential)?;

        Ok(credential)
    }

    /// Forget the cached credential
    pub fn clear(&self) -> Result<()> {
        self.store.clear()
    }

    async fn refresh(&self, refresh_token: String) -> Result<Credential> {
        let grant = self.endpoint.refresh(&refresh_token).await?;
        Ok(Credential::from_grant(
            grant,
            &self.scopes,
            Some(refresh_token),
        ))
    }

    async fn authorize(&self) -> Result<Credential> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let prompt = ConsentPrompt::new(&self.endpoint, &self.scopes, &pkce_challenge);
        let grant = self.presenter.present(prompt).await?;

        let tokens = self.endpoint.exchange_code(grant, pkce_verifier).await?;
        Ok(Credential::from_grant(tokens, &self.scopes, None))
    }
}
