use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::Fields;

/// Opaque identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated identity context. Passed explicitly to every
/// collaborator call that needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    /// Bearer token for remote collaborators; in-process ones leave it unset.
    pub id_token: Option<String>,
}

/// Profile document written once at sign-up under `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub streak: i64,
    pub points: i64,
}

impl UserProfile {
    pub fn new(email: &str, created_at: i64) -> Self {
        Self {
            email: email.to_string(),
            name: display_name(email).to_string(),
            created_at,
            streak: 0,
            points: 0,
        }
    }

    pub fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Fields::new(),
        }
    }
}

/// Everything before the first `@`, or the whole string when there is none.
pub fn display_name(email: &str) -> &str {
    email.split_once('@').map_or(email, |(name, _)| name)
}
