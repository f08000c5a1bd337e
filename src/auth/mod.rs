//! Authentication: sign-in, sign-up, and token refresh.

pub mod client;
pub mod refresh;
pub mod types;
pub mod validation;

pub use client::{AuthApi, SIGNIN_PATH, SIGNUP_PATH};
pub use refresh::{RefreshResponse, TokenRefresher, REFRESH_PATH};
pub use types::{SigninRequest, SigninResponse, SignupRequest};
