//! Credential handling for mail API calls: a provider abstraction and the
//! "call, refresh once on 401, call again" decorator.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::gmail::{sanitize_token, GmailError, GMAIL_TIMEOUT};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current access token.
    async fn token(&self) -> Result<String, GmailError>;

    /// Obtains a new access token after `rejected` was refused upstream.
    /// If another caller already replaced it, the newer token is returned as is.
    async fn refresh(&self, rejected: &str) -> Result<String, GmailError>;
}

#[async_trait]
impl<P> CredentialProvider for Arc<P>
where
    P: CredentialProvider + ?Sized,
{
    async fn token(&self) -> Result<String, GmailError> {
        self.as_ref().token().await
    }

    async fn refresh(&self, rejected: &str) -> Result<String, GmailError> {
        self.as_ref().refresh(rejected).await
    }
}

/// Runs `call` with the current token. If upstream answers unauthorized, the
/// credential is refreshed and the call retried exactly once.
pub async fn with_credential_refresh<P, T, F, Fut>(provider: &P, mut call: F) -> Result<T, GmailError>
where
    P: CredentialProvider + ?Sized,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, GmailError>>,
{
    let token = provider.token().await?;
    match call(token.clone()).await {
        Err(GmailError::Unauthorized) => {
            warn!("Access token rejected, refreshing credentials and retrying once");
            let fresh = provider.refresh(&token).await?;
            call(fresh).await
        }
        other => other,
    }
}

/// A token supplied by the client for one request. It cannot be refreshed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self(sanitize_token(token))
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn token(&self) -> Result<String, GmailError> {
        Ok(self.0.clone())
    }

    async fn refresh(&self, _rejected: &str) -> Result<String, GmailError> {
        Err(GmailError::Unauthorized)
    }
}

#[derive(Debug, Clone)]
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Access token backed by an OAuth refresh token (Google token endpoint).
///
/// Concurrent refreshes are serialized; callers that lost the race reuse the
/// token the winner obtained instead of hitting the endpoint again.
pub struct RefreshingToken {
    client: Client,
    token_url: String,
    credentials: OAuthClientCredentials,
    refresh_token: String,
    current: RwLock<String>,
    refreshing: Mutex<()>,
}

impl RefreshingToken {
    pub fn new(
        credentials: OAuthClientCredentials,
        access_token: &str,
        refresh_token: String,
    ) -> Result<Self, GmailError> {
        Ok(Self {
            client: Client::builder().timeout(GMAIL_TIMEOUT).build()?,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            credentials,
            refresh_token,
            current: RwLock::new(sanitize_token(access_token)),
            refreshing: Mutex::new(()),
        })
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[async_trait]
impl CredentialProvider for RefreshingToken {
    async fn token(&self) -> Result<String, GmailError> {
        Ok(self.current.read().await.clone())
    }

    async fn refresh(&self, rejected: &str) -> Result<String, GmailError> {
        let _refreshing = self.refreshing.lock().await;
        {
            let current = self.current.read().await;
            if current.as_str() != rejected {
                debug!("Access token already refreshed by a concurrent call");
                return Ok(current.clone());
            }
        }

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GmailError::Credentials(format!(
                "token refresh failed with {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        let mut current = self.current.write().await;
        *current = token.access_token.clone();
        info!("Refreshed Gmail access token");
        Ok(token.access_token)
    }
}
