//! Request and response bodies for the auth endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::{has_letter_and_digit, not_empty_trimmed, MIN_PASSWORD_LENGTH};
use crate::session::User;

/// Sign-in request body.
#[derive(Debug, Clone, Serialize)]
pub struct SigninRequest<'a> {
    /// Login name.
    pub username: &'a str,
    /// Password.
    pub password: &'a str,
}

/// Sign-in response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    /// User ID.
    #[serde(flatten)]
    pub user: User,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
}

/// Sign-up request body.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Login name.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub username: String,
    /// Password.
    #[validate(
        length(min = MIN_PASSWORD_LENGTH, message = "Password must be at least 8 characters"),
        custom(function = "has_letter_and_digit")
    )]
    pub password: String,
    /// Password confirmation; must equal `password`.
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    /// Display name.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub name: String,
}

impl SignupRequest {
    /// Create a sign-up request.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
            name: name.into(),
        }
    }
}
