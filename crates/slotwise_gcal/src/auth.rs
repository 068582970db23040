// File: crates/slotwise_gcal/src/auth.rs
//! The authorization lifecycle for both calendar credential paths.
//!
//! The delegated OAuth credential (full-featured path) is owned by
//! [`AuthManager`]: load-from-storage at startup, expiry detection, silent
//! refresh on use, persist-after-refresh, and the interactive grant flow.
//! The service-account credential (degraded path) is a thin token source
//! around yup-oauth2 with no lifecycle of its own.

use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use slotwise_common::services::BoxFuture;
use slotwise_config::GcalConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use url::Url;

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Access tokens are treated as expired this long before their actual
/// expiry so an in-flight request never carries a token that dies mid-call.
const EXPIRY_SKEW_SECONDS: i64 = 60;

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Error, Debug)]
pub enum TokenStoreError {
    #[error("Token store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Token store contains invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth client credentials are not configured")]
    NotConfigured,
    #[error("Invalid OAuth endpoint or redirect URI: {0}")]
    InvalidUri(String),
    #[error("Token exchange failed: {0}")]
    Exchange(String),
    #[error("Token refresh failed: {0}")]
    Refresh(String),
    #[error("No authorized delegated credential is available")]
    NotAuthorized,
    #[error("Service account credential error: {0}")]
    ServiceAccount(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
    #[error(transparent)]
    Store(#[from] TokenStoreError),
}

/// The delegated credential as persisted and held in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => expiry <= now + Duration::seconds(EXPIRY_SKEW_SECONDS),
            // No recorded expiry: assume still usable.
            None => false,
        }
    }
}

/// Lifecycle of the delegated credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationState {
    /// No stored token and no completed grant.
    Unconfigured,
    /// A grant flow has been started but not completed.
    AwaitingGrant,
    Authorized(TokenSet),
    /// Access token past expiry; healed back to `Authorized` on next use
    /// when a refresh token exists.
    Expired(TokenSet),
}

/// Durable storage for the delegated token blob.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenSet>, TokenStoreError>;
    fn save(&self, tokens: &TokenSet) -> Result<(), TokenStoreError>;
}

/// JSON-file token store with atomic replace on save.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileTokenStore {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenSet>, TokenStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let tokens = serde_json::from_str(&raw)?;
        Ok(Some(tokens))
    }

    fn save(&self, tokens: &TokenSet) -> Result<(), TokenStoreError> {
        let raw = serde_json::to_string_pretty(tokens)?;
        // Write-then-rename so a crash mid-write never leaves a corrupt
        // partial file behind.
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, raw)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Shape of Google's token endpoint response for a refresh grant.
#[derive(Deserialize, Debug)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// Owns the delegated credential and is the only component allowed to
/// mutate or persist it. Injected from the composition root; holds no
/// global state.
pub struct AuthManager {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_uri: String,
    token_uri: String,
    store: Box<dyn TokenStore>,
    state: Mutex<AuthorizationState>,
    http: reqwest::Client,
}

impl AuthManager {
    pub fn new(config: &GcalConfig, store: Box<dyn TokenStore>) -> Result<Self, AuthError> {
        // Token posts must not follow redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(
                config.request_timeout_secs.unwrap_or(10),
            ))
            .build()
            .map_err(|e| AuthError::HttpClient(e.to_string()))?;

        Ok(AuthManager {
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            store,
            state: Mutex::new(AuthorizationState::Unconfigured),
            http,
        })
    }

    /// Points the manager at non-Google endpoints. Used by tests and
    /// deployments behind an OAuth proxy.
    pub fn with_endpoints(mut self, auth_uri: impl Into<String>, token_uri: impl Into<String>) -> Self {
        self.auth_uri = auth_uri.into();
        self.token_uri = token_uri.into();
        self
    }

    fn oauth_client(&self, redirect_uri: &str) -> Result<OAuthClient, AuthError> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(AuthError::NotConfigured);
        };
        let client = BasicClient::new(ClientId::new(client_id.clone()))
            .set_client_secret(ClientSecret::new(client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(self.auth_uri.clone())
                    .map_err(|e| AuthError::InvalidUri(e.to_string()))?,
            )
            .set_token_uri(
                TokenUrl::new(self.token_uri.clone())
                    .map_err(|e| AuthError::InvalidUri(e.to_string()))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(redirect_uri.to_string())
                    .map_err(|e| AuthError::InvalidUri(e.to_string()))?,
            );
        Ok(client)
    }

    /// Reads the persisted token and settles the initial state.
    ///
    /// An unexpired token authorizes immediately; an expired one with a
    /// refresh token is healed right away so the first request does not pay
    /// the refresh latency. A failed refresh leaves the manager `Expired`
    /// and the service continues in degraded mode.
    pub async fn load_or_init(&self) {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to read persisted token: {e}");
                None
            }
        };

        let mut state = self.state.lock().await;
        match stored {
            None => {
                *state = AuthorizationState::Unconfigured;
                info!("No stored delegated token; calendar authorization pending");
            }
            Some(tokens) if !tokens.is_expired(Utc::now()) => {
                *state = AuthorizationState::Authorized(tokens);
                info!("Loaded delegated calendar credential from storage");
            }
            Some(tokens) => match self.refresh(&tokens).await {
                Ok(fresh) => {
                    self.persist(&fresh);
                    *state = AuthorizationState::Authorized(fresh);
                    info!("Refreshed expired delegated credential at startup");
                }
                Err(e) => {
                    warn!("Stored token expired and refresh failed: {e}");
                    *state = AuthorizationState::Expired(tokens);
                }
            },
        }
    }

    /// Builds the provider consent URL for the interactive grant flow,
    /// requesting offline access and the calendar scope.
    pub async fn begin_grant(&self, redirect_uri: &str) -> Result<Url, AuthError> {
        let client = self.oauth_client(redirect_uri)?;
        let (authorize_url, _csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(CALENDAR_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        let mut state = self.state.lock().await;
        if matches!(*state, AuthorizationState::Unconfigured) {
            *state = AuthorizationState::AwaitingGrant;
        }
        Ok(authorize_url)
    }

    /// Exchanges the one-time grant code for tokens, persists them, and
    /// becomes `Authorized`. A second successful call simply replaces the
    /// previous tokens.
    pub async fn complete_grant(&self, code: &str, redirect_uri: &str) -> Result<(), AuthError> {
        let client = self.oauth_client(redirect_uri)?;
        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let tokens = TokenSet {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_at: response
                .expires_in()
                .and_then(|d| Duration::from_std(d).ok())
                .map(|d| Utc::now() + d),
        };

        self.persist(&tokens);
        let mut state = self.state.lock().await;
        *state = AuthorizationState::Authorized(tokens);
        info!("Delegated calendar authorization completed");
        Ok(())
    }

    /// True iff a usable delegated credential exists, refreshing silently
    /// when the access token has expired.
    pub async fn is_authorized(&self) -> bool {
        self.ensure_fresh().await.is_some()
    }

    /// The current access token, after an on-demand refresh if needed.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.ensure_fresh().await.ok_or(AuthError::NotAuthorized)
    }

    /// Refreshes through the mutex so concurrent callers cannot interleave;
    /// a duplicate refresh against the provider is harmless (the refresh
    /// grant is idempotent per refresh token).
    async fn ensure_fresh(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let stale = match &*state {
            AuthorizationState::Authorized(tokens) if !tokens.is_expired(now) => {
                return Some(tokens.access_token.clone());
            }
            AuthorizationState::Authorized(tokens) | AuthorizationState::Expired(tokens) => {
                tokens.clone()
            }
            AuthorizationState::Unconfigured | AuthorizationState::AwaitingGrant => return None,
        };

        match self.refresh(&stale).await {
            Ok(fresh) => {
                self.persist(&fresh);
                let token = fresh.access_token.clone();
                *state = AuthorizationState::Authorized(fresh);
                Some(token)
            }
            Err(e) => {
                warn!("Silent token refresh failed: {e}");
                *state = AuthorizationState::Expired(stale);
                None
            }
        }
    }

    async fn refresh(&self, tokens: &TokenSet) -> Result<TokenSet, AuthError> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::Refresh("no refresh token on record".to_string()))?;
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(AuthError::NotConfigured);
        };

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        let response = self
            .http
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Refresh(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Refresh(format!(
                "provider returned {}",
                response.status()
            )));
        }
        let body: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Refresh(e.to_string()))?;

        Ok(TokenSet {
            access_token: body.access_token,
            // Google only returns a refresh token on the first grant.
            refresh_token: body.refresh_token.or_else(|| tokens.refresh_token.clone()),
            expires_at: body.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        })
    }

    /// Persistence failures are reported but never roll back the in-memory
    /// state; the session stays usable until the next restart.
    fn persist(&self, tokens: &TokenSet) {
        if let Err(e) = self.store.save(tokens) {
            error!("Failed to persist delegated token: {e}");
        }
    }
}

// --- Service-account credential (degraded path) ---

/// Token source for the degraded creation path. A trait seam like
/// [`TokenStore`] so the orchestrator can run against a double.
pub trait ServiceTokenSource: Send + Sync {
    fn access_token(&self) -> BoxFuture<'_, String, AuthError>;
}

type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
type SaAuthenticator = yup_oauth2::authenticator::Authenticator<HttpsConnector>;

/// Non-expiring, non-interactive credential for the degraded creation path.
/// yup-oauth2 caches and rotates the short-lived access tokens internally.
pub struct ServiceCredential {
    authenticator: SaAuthenticator,
}

impl ServiceCredential {
    pub async fn from_key_file(path: &Path) -> Result<Self, AuthError> {
        let sa_key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;
        let authenticator = yup_oauth2::ServiceAccountAuthenticator::builder(sa_key)
            .build()
            .await
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;
        Ok(ServiceCredential { authenticator })
    }
}

impl ServiceTokenSource for ServiceCredential {
    fn access_token(&self) -> BoxFuture<'_, String, AuthError> {
        Box::pin(async move {
            let token = self
                .authenticator
                .token(&[CALENDAR_SCOPE])
                .await
                .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;
            token
                .token()
                .map(|t| t.to_string())
                .ok_or_else(|| {
                    AuthError::ServiceAccount("authenticator returned no token".to_string())
                })
        })
    }
}
