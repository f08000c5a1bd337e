//! Session management.
//!
//! Holds the signed-in user and token pair, persists them to durable
//! storage, and gates readers on hydration.

pub mod storage;
pub mod store;
pub mod types;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{SessionStore, SESSION_STORAGE_KEY};
pub use types::{PersistedSession, PersistedState, Session, User};
