//! Authenticated request gateway.
//!
//! Attaches the current access token to outgoing requests and recovers from
//! an expired token exactly once per request. Requests that hit 401 while a
//! refresh is already running queue on that refresh instead of starting a
//! second one, then replay with its result. The queue lives in the session
//! store, so gateways sharing a store share it too.

pub mod request;
pub mod response;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info};

use crate::auth::TokenRefresher;
use crate::error::RefreshError;
use crate::session::SessionStore;
use crate::Result;

pub use request::{ApiRequest, Attachment, RequestBody};

/// Sends requests with the session's bearer token and handles refresh.
#[derive(Debug, Clone)]
pub struct Gateway {
    http: Client,
    base_url: String,
    store: SessionStore,
    refresher: TokenRefresher,
}

impl Gateway {
    /// Create a gateway.
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        store: SessionStore,
        refresher: TokenRefresher,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
            refresher,
        }
    }

    /// Session store this gateway reads tokens from.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a token refresh is currently running for this session.
    pub fn is_refreshing(&self) -> bool {
        self.store.is_refreshing()
    }

    /// Send `request`, refreshing the access token once if the server answers 401.
    ///
    /// Every response other than 401 is returned unchanged, including other
    /// error statuses. If the refresh fails the session has already been
    /// cleared and `ClientError::Refresh` is returned.
    pub async fn request(&self, request: &ApiRequest) -> Result<Response> {
        self.store.ready().await;

        let token = self.store.access_token();
        let response = self.send(request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(
            method = %request.method(),
            path = request.path(),
            "request unauthorized, refreshing access token"
        );
        let fresh = self.fresh_token(token.as_deref()).await?;

        debug!(method = %request.method(), path = request.path(), "replaying request");
        self.send(request, Some(fresh.as_str())).await
    }

    async fn send(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response> {
        let response = request
            .build(&self.http, &self.base_url, token)?
            .send()
            .await?;
        debug!(
            method = %request.method(),
            path = request.path(),
            status = response.status().as_u16(),
            "response received"
        );
        Ok(response)
    }

    /// Token to replay with after a 401 on a request sent with `stale`.
    async fn fresh_token(&self, stale: Option<&str>) -> Result<String> {
        // Someone else already replaced the token this request was sent with.
        if let Some(current) = self.store.access_token() {
            if Some(current.as_str()) != stale {
                debug!("access token already refreshed");
                return Ok(current);
            }
        }

        Ok(self.join_or_start_refresh().await?)
    }

    /// Wait for the session's in-flight refresh, starting one if none is running.
    async fn join_or_start_refresh(&self) -> std::result::Result<String, RefreshError> {
        let (outcome, started) = self.store.join_refresh();

        if started {
            info!("starting token refresh");
            let refresher = self.refresher.clone();
            let store = self.store.clone();
            // Detached: the refresh outlives a cancelled caller.
            tokio::spawn(async move {
                let result = match tokio::spawn(async move { refresher.refresh().await }).await {
                    Ok(result) => result,
                    Err(e) => Err(RefreshError::RemoteRejected {
                        status: None,
                        message: format!("refresh task failed: {e}"),
                    }),
                };
                store.settle_refresh(result);
            });
        } else {
            debug!("waiting on in-flight token refresh");
        }

        outcome.await.unwrap_or_else(|_| {
            Err(RefreshError::RemoteRejected {
                status: None,
                message: "token refresh was abandoned".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStorage, User};
    use std::sync::{Arc, Mutex};

    fn gateway(store: SessionStore) -> Gateway {
        let http = Client::new();
        let refresher = TokenRefresher::new(http.clone(), "http://127.0.0.1:9", store.clone());
        Gateway::new(http, "http://127.0.0.1:9", store, refresher)
    }

    #[tokio::test]
    async fn test_joiners_share_one_refresh() {
        let store = SessionStore::open(Arc::new(MemoryStorage::new()));
        store.login(User::new("1", "kim", "Kim"), "a".to_string(), "r".to_string());
        let gateway = gateway(store.clone());

        let (a, b) = tokio::join!(
            gateway.join_or_start_refresh(),
            gateway.join_or_start_refresh()
        );
        assert_eq!(a, b);
        assert!(matches!(a, Err(RefreshError::RemoteRejected { .. })));
        assert!(!gateway.is_refreshing(), "slot must be released after settling");
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_gateways_over_one_store_share_the_refresh() {
        let store = SessionStore::open(Arc::new(MemoryStorage::new()));
        let first = gateway(store.clone());
        let second = gateway(store.clone());

        let (_rx, started) = store.join_refresh();
        assert!(started);
        assert!(first.is_refreshing());
        assert!(second.is_refreshing());
        store.settle_refresh(Err(RefreshError::NoToken));
        assert!(!second.is_refreshing());
    }

    #[tokio::test]
    async fn test_waiters_resolve_in_arrival_order() {
        let store = SessionStore::open(Arc::new(MemoryStorage::new()));
        let order = Arc::new(Mutex::new(Vec::new()));

        let (_driver, started) = store.join_refresh();
        assert!(started);
        let receivers: Vec<_> = (0..5).map(|_| store.join_refresh().0).collect();

        // Spawned in reverse so poll order differs from arrival order.
        let mut handles = Vec::new();
        for (i, rx) in receivers.into_iter().enumerate().rev() {
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let token = rx.await.unwrap().unwrap();
                order.lock().unwrap().push((i, token));
            }));
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        store.settle_refresh(Ok("fresh".to_string()));
        for handle in handles {
            handle.await.unwrap();
        }

        let order = order.lock().unwrap();
        let indices: Vec<usize> = order.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(order.iter().all(|(_, token)| token == "fresh"));
    }

    #[tokio::test]
    async fn test_fresh_token_skips_refresh_when_already_rotated() {
        let store = SessionStore::open(Arc::new(MemoryStorage::new()));
        store.login(User::new("1", "kim", "Kim"), "new".to_string(), "r".to_string());
        let gateway = gateway(store);

        let token = gateway.fresh_token(Some("old")).await.unwrap();
        assert_eq!(token, "new");
        assert!(!gateway.is_refreshing());
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let store = SessionStore::open(Arc::new(MemoryStorage::new()));
        let gateway = gateway(store);

        let result = gateway.request(&ApiRequest::get("/boards/1")).await;
        assert!(matches!(result, Err(crate::ClientError::Transport(_))));
    }
}
