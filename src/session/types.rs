//! Session data types.

use serde::{Deserialize, Deserializer, Serialize};

/// Signed-in user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID. The API sends it as a string or a number; it is kept as text.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
}

impl User {
    /// Create a user.
    pub fn new(id: impl Into<String>, username: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: name.into(),
        }
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Snapshot of the authentication state.
///
/// The two tokens are either both present or both absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Signed-in user, if any.
    pub user: Option<User>,
    /// Short-lived bearer credential.
    pub access_token: Option<String>,
    /// Credential used to obtain a new access token.
    pub refresh_token: Option<String>,
    /// Whether persisted state has been loaded.
    pub hydrated: bool,
}

impl Session {
    /// Whether the session carries credentials. Empty tokens count as absent.
    pub fn is_authenticated(&self) -> bool {
        has_token(&self.access_token) && has_token(&self.refresh_token)
    }

    pub(crate) fn clear_credentials(&mut self) {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
    }
}

pub(crate) fn has_token(token: &Option<String>) -> bool {
    token.as_deref().is_some_and(|t| !t.is_empty())
}

/// Persisted portion of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Signed-in user.
    #[serde(default)]
    pub user: Option<User>,
    /// Access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Envelope written under the session storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Stored fields.
    pub state: PersistedState,
    /// Layout version.
    #[serde(default)]
    pub version: u32,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            state: PersistedState {
                user: session.user.clone(),
                access_token: session.access_token.clone(),
                refresh_token: session.refresh_token.clone(),
            },
            version: 0,
        }
    }
}
