//! Post CRUD calls.

use std::collections::BTreeMap;

use reqwest::{Response, StatusCode};
use tracing::{debug, info, warn};

use super::types::{Category, Post, PostPage, PostRequest};
use crate::gateway::response::{api_error, read_json};
use crate::gateway::{ApiRequest, Attachment, Gateway};
use crate::{ClientError, Result};

/// Base path of the board endpoints.
pub const BOARDS_PATH: &str = "/boards";

/// Client for the post endpoints. Every call goes through the gateway.
#[derive(Debug, Clone)]
pub struct PostsApi {
    gateway: Gateway,
}

impl PostsApi {
    /// Create a posts client.
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Fetch one page of posts.
    pub async fn list_posts(&self, page: u32, size: u32) -> Result<PostPage> {
        let request = ApiRequest::get(BOARDS_PATH)
            .query("page", page)
            .query("size", size);
        let response = self.success(&request).await?;
        read_json(response).await
    }

    /// Fetch a single post.
    pub async fn get_post(&self, id: i64) -> Result<Post> {
        let request = ApiRequest::get(post_path(id));
        let response = self.gateway.request(&request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("post {id}")));
        }
        let response = ensure_success(response).await?;
        read_json(response).await
    }

    /// Create a post with an optional image.
    pub async fn create_post(&self, post: &PostRequest, file: Option<Attachment>) -> Result<Post> {
        let request = ApiRequest::post(BOARDS_PATH).multipart(post, file)?;
        let response = self.success(&request).await?;
        let created: Post = read_json(response).await?;
        info!(post_id = created.id, "post created");
        Ok(created)
    }

    /// Replace a post's fields, optionally with a new image.
    pub async fn update_post(
        &self,
        id: i64,
        post: &PostRequest,
        file: Option<Attachment>,
    ) -> Result<Post> {
        let request = ApiRequest::patch(post_path(id)).multipart(post, file)?;
        let response = self.success(&request).await?;
        let updated: Post = read_json(response).await?;
        info!(post_id = id, "post updated");
        Ok(updated)
    }

    /// Delete a post.
    pub async fn delete_post(&self, id: i64) -> Result<()> {
        let request = ApiRequest::delete(post_path(id));
        self.success(&request).await?;
        info!(post_id = id, "post deleted");
        Ok(())
    }

    /// Category labels from the server, or the built-in labels if the
    /// server cannot provide them.
    pub async fn categories(&self) -> BTreeMap<Category, String> {
        match self.fetch_categories().await {
            Ok(labels) if !labels.is_empty() => labels,
            Ok(_) => {
                debug!("server returned no known categories, using defaults");
                Category::default_labels()
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch categories, using defaults");
                Category::default_labels()
            }
        }
    }

    async fn fetch_categories(&self) -> Result<BTreeMap<Category, String>> {
        let request = ApiRequest::get(format!("{BOARDS_PATH}/categories"));
        let response = self.success(&request).await?;
        let raw: BTreeMap<String, String> = read_json(response).await?;

        Ok(raw
            .into_iter()
            .filter_map(|(key, label)| key.parse::<Category>().ok().map(|c| (c, label)))
            .collect())
    }

    async fn success(&self, request: &ApiRequest) -> Result<Response> {
        let response = self.gateway.request(request).await?;
        ensure_success(response).await
    }
}

fn post_path(id: i64) -> String {
    format!("{BOARDS_PATH}/{id}")
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(api_error(response).await)
    }
}
