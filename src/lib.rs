//! board-client - client library for a bulletin-board HTTP API.
//!
//! Covers sign-up and sign-in, a persisted token session with transparent
//! access-token refresh, and post CRUD with optional image attachments.

pub mod auth;
pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod session;

pub use auth::{AuthApi, SigninResponse, SignupRequest, TokenRefresher};
pub use board::{Category, Post, PostPage, PostRequest, PostsApi};
pub use client::BoardClient;
pub use config::Config;
pub use error::{ClientError, FieldErrors, RefreshError, Result};
pub use gateway::{ApiRequest, Attachment, Gateway, RequestBody};
pub use session::{
    FileStorage, MemoryStorage, Session, SessionStorage, SessionStore, User, SESSION_STORAGE_KEY,
};
