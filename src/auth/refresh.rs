//! Access token refresh.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RefreshError;
use crate::gateway::response::error_message;
use crate::session::SessionStore;

/// Path of the refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Token refresh response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token.
    pub access_token: String,
    /// Rotated refresh token, if the server issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Exchanges the stored refresh token for a new access token.
///
/// Concurrent calls are not coordinated here; `Gateway` guarantees that
/// only one refresh runs at a time.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    http: Client,
    base_url: String,
    store: SessionStore,
}

impl TokenRefresher {
    /// Create a refresher talking to `base_url`.
    pub fn new(http: Client, base_url: impl Into<String>, store: SessionStore) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
        }
    }

    /// Obtain a new access token and store it.
    ///
    /// Any failure clears the session before returning the error. If the
    /// session is logged out or replaced while the exchange is in flight,
    /// the result is discarded and the newer session is left alone.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        self.store.ready().await;

        let Some(refresh_token) = self.store.refresh_token().filter(|t| !t.is_empty()) else {
            warn!("no refresh token stored, signing out");
            self.store.logout();
            return Err(RefreshError::NoToken);
        };

        match self.exchange(&refresh_token).await {
            Ok(tokens) => {
                let rotated = tokens.refresh_token.filter(|t| !t.is_empty());
                let was_rotated = rotated.is_some();

                if !self
                    .store
                    .apply_refresh(&refresh_token, tokens.access_token.clone(), rotated)
                {
                    warn!("session changed during token refresh, discarding result");
                    return Err(RefreshError::Superseded);
                }
                debug!(rotated = was_rotated, "access token refreshed");
                Ok(tokens.access_token)
            }
            Err(e) => {
                warn!("token refresh failed, signing out: {}", e);
                self.store.logout_if_current(&refresh_token);
                Err(e)
            }
        }
    }

    async fn exchange(&self, refresh_token: &str) -> Result<RefreshResponse, RefreshError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, REFRESH_PATH))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| RefreshError::RemoteRejected {
                status: None,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let (status, message) = error_message(response).await;
            return Err(RefreshError::RemoteRejected {
                status: Some(status.as_u16()),
                message,
            });
        }

        let tokens: RefreshResponse =
            response
                .json()
                .await
                .map_err(|e| RefreshError::RemoteRejected {
                    status: Some(status.as_u16()),
                    message: format!("invalid refresh response: {e}"),
                })?;

        if tokens.access_token.is_empty() {
            return Err(RefreshError::RemoteRejected {
                status: Some(status.as_u16()),
                message: "refresh response carried an empty access token".to_string(),
            });
        }

        Ok(tokens)
    }
}
