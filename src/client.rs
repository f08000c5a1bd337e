//! Client facade wiring the session store, gateway and resource clients.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::auth::{AuthApi, SignupRequest, TokenRefresher};
use crate::board::PostsApi;
use crate::config::{ApiConfig, Config};
use crate::gateway::Gateway;
use crate::session::{FileStorage, Session, SessionStore};
use crate::{ClientError, Result};

/// Entry point for talking to the board API.
///
/// Cloning is cheap; clones share the session store and the in-flight
/// refresh.
#[derive(Debug, Clone)]
pub struct BoardClient {
    store: SessionStore,
    auth: AuthApi,
    posts: PostsApi,
    gateway: Gateway,
}

impl BoardClient {
    /// Build a client for `api` backed by `store`.
    pub fn new(api: &ApiConfig, store: SessionStore) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(api.user_agent.as_str())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {}", e)))?;

        let base_url = api.normalized_base_url().to_string();
        let refresher = TokenRefresher::new(http.clone(), base_url.clone(), store.clone());
        let gateway = Gateway::new(http.clone(), base_url.clone(), store.clone(), refresher);

        Ok(Self {
            auth: AuthApi::new(http, base_url),
            posts: PostsApi::new(gateway.clone()),
            gateway,
            store,
        })
    }

    /// Build a client from configuration, restoring any persisted session
    /// from `session.storage_dir`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let storage = FileStorage::new(&config.session.storage_dir);
        let store = SessionStore::open(Arc::new(storage));
        info!(
            base_url = config.api.normalized_base_url(),
            authenticated = store.is_authenticated(),
            "board client ready"
        );

        Self::new(&config.api, store)
    }

    /// Sign in and store the returned identity and tokens.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let signin = self.auth.signin(username, password).await?;
        self.store
            .login(signin.user, signin.access_token, signin.refresh_token);
        Ok(self.store.state())
    }

    /// Register a new account. Does not sign in.
    pub async fn signup(&self, request: &SignupRequest) -> Result<serde_json::Value> {
        self.auth.signup(request).await
    }

    /// Drop the current session.
    pub fn logout(&self) {
        self.store.logout();
        info!("signed out");
    }

    /// Session store.
    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    /// Auth endpoints.
    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    /// Post endpoints.
    pub fn posts(&self) -> &PostsApi {
        &self.posts
    }

    /// Authenticated request gateway.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}
