//! Sign-in and sign-up calls.
//!
//! These endpoints are public, so they go straight to the HTTP client
//! rather than through the gateway.

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::types::{SigninRequest, SigninResponse, SignupRequest};
use super::validation;
use crate::gateway::response::{api_error, error_message, field_errors_from_body, read_json, read_json_or_null};
use crate::{ClientError, Result};

/// Path of the sign-in endpoint.
pub const SIGNIN_PATH: &str = "/auth/signin";

/// Path of the sign-up endpoint.
pub const SIGNUP_PATH: &str = "/auth/signup";

/// Client for the authentication endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    http: Client,
    base_url: String,
}

impl AuthApi {
    /// Create an auth client.
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Exchange credentials for a user identity and token pair.
    ///
    /// This does not touch the session store; see `BoardClient::login`.
    pub async fn signin(&self, username: &str, password: &str) -> Result<SigninResponse> {
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::Auth(
                "Username and password are required".to_string(),
            ));
        }

        let response = self
            .http
            .post(self.url(SIGNIN_PATH))
            .json(&SigninRequest { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            warn!(status = status.as_u16(), "sign-in rejected");
            return Err(ClientError::Auth(message));
        }

        let signin: SigninResponse = read_json(response).await?;
        info!(username = %signin.user.username, "signed in");
        Ok(signin)
    }

    /// Register a new account.
    ///
    /// Input is validated locally first; field-level failures from either
    /// side come back as `ClientError::Validation`.
    pub async fn signup(&self, request: &SignupRequest) -> Result<serde_json::Value> {
        validation::validate(request)?;

        let response = self
            .http
            .post(self.url(SIGNUP_PATH))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(username = %request.username, "account created");
            return read_json_or_null(response).await;
        }

        if status.is_client_error() && status != StatusCode::UNAUTHORIZED {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Validation(field_errors_from_body(status, &text)));
        }

        Err(api_error(response).await)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
