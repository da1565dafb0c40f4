use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

pub const USERS: &str = "users";
pub const MOODS: &str = "moods";

/// A stored document as returned by a collaborator query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    #[default]
    Descending,
}

/// Slash-separated path with an odd number of segments, e.g. `users/u1/moods`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Slash-separated path with an even number of segments, e.g. `users/u1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    parent: CollectionPath,
    id: String,
}

fn split_segments(raw: &str) -> AppResult<Vec<String>> {
    let segments: Vec<String> = raw
        .trim_matches('/')
        .split('/')
        .map(str::to_string)
        .collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(AppError::Validation(format!("Invalid path: {raw}")));
    }
    Ok(segments)
}

impl CollectionPath {
    pub fn root(name: &str) -> Self {
        Self {
            segments: vec![name.to_string()],
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        let segments = split_segments(raw)?;
        if segments.len() % 2 == 0 {
            return Err(AppError::Validation(format!(
                "Not a collection path: {raw}"
            )));
        }
        Ok(Self { segments })
    }

    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath {
            parent: self.clone(),
            id: id.to_string(),
        }
    }

    /// The user partition this path belongs to, if any.
    pub fn owner(&self) -> Option<&str> {
        owner_of(&self.segments)
    }
}

impl DocumentPath {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let mut segments = split_segments(raw)?;
        if segments.len() % 2 != 0 {
            return Err(AppError::Validation(format!("Not a document path: {raw}")));
        }
        let id = segments.pop().unwrap_or_default();
        Ok(Self {
            parent: CollectionPath { segments },
            id,
        })
    }

    pub fn collection(&self, name: &str) -> CollectionPath {
        let mut segments = self.parent.segments.clone();
        segments.push(self.id.clone());
        segments.push(name.to_string());
        CollectionPath { segments }
    }

    pub fn parent(&self) -> &CollectionPath {
        &self.parent
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> Option<&str> {
        match self.parent.segments.as_slice() {
            [root] if root == USERS => Some(self.id.as_str()),
            _ => self.parent.owner(),
        }
    }
}

fn owner_of(segments: &[String]) -> Option<&str> {
    match segments {
        [root, uid, ..] if root == USERS => Some(uid.as_str()),
        _ => None,
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.id)
    }
}

/// `users/{uid}`
pub fn user_document(user_id: &str) -> DocumentPath {
    CollectionPath::root(USERS).doc(user_id)
}

/// `users/{uid}/moods`
pub fn mood_collection(user_id: &str) -> CollectionPath {
    user_document(user_id).collection(MOODS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_collection_path() {
        let path = mood_collection("u1");
        assert_eq!(path.to_string(), "users/u1/moods");
        assert_eq!(path.owner(), Some("u1"));
    }

    #[test]
    fn test_parse_rejects_wrong_parity() {
        assert!(CollectionPath::parse("users/u1").is_err());
        assert!(DocumentPath::parse("users/u1/moods").is_err());
        assert!(CollectionPath::parse("users//moods").is_err());
    }

    #[test]
    fn test_parse_trims_slashes() {
        let path = DocumentPath::parse("/users/u1/").unwrap();
        assert_eq!(path, user_document("u1"));
        assert_eq!(path.parent().to_string(), "users");
        assert_eq!(path.id(), "u1");
        assert_eq!(path.owner(), Some("u1"));
    }

    #[test]
    fn test_owner_outside_users_is_none() {
        let path = CollectionPath::parse("public").unwrap();
        assert_eq!(path.owner(), None);
    }
}
