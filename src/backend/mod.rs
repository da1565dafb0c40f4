//! Collaborator seams: the identity provider and the document database.
//!
//! The gateway and entry store only ever talk to these traits. Each call is
//! a single attempt; failures come back as whatever the implementation
//! reports, without retry.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::document::{CollectionPath, Direction, Document, DocumentPath, Fields};
use crate::models::user::Session;

pub mod http;
pub mod memory;
pub mod notify;
pub mod postgres;

pub const EMAIL_IN_USE: &str = "The email address is already in use by another account.";
pub const INVALID_CREDENTIAL: &str =
    "The supplied auth credential is incorrect, malformed or has expired.";
pub const NO_USER_RECORD: &str =
    "There is no user record corresponding to this identifier. The user may have been deleted.";
pub const INVALID_RESET_TOKEN: &str =
    "The password reset link is invalid, has expired or has already been used.";

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an email/password credential and return a session for it.
    async fn create_user(&self, email: &str, password: &str) -> AppResult<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session>;

    /// Remove the credential behind `session`.
    async fn delete_user(&self, session: &Session) -> AppResult<()>;

    /// Issue a single-use reset token for `email` and hand it to delivery.
    async fn send_password_reset(&self, email: &str) -> AppResult<()>;

    /// Redeem a reset token, replacing the account's password.
    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()>;
}

/// Delivers freshly issued reset tokens to the account holder.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn deliver(&self, email: &str, token: &str) -> AppResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or overwrite the document at `path`.
    async fn set_document(
        &self,
        session: &Session,
        path: &DocumentPath,
        fields: Fields,
    ) -> AppResult<()>;

    /// Append a document under a store-assigned id and return that id.
    async fn add_document(
        &self,
        session: &Session,
        collection: &CollectionPath,
        fields: Fields,
    ) -> AppResult<String>;

    /// All documents in `collection` ordered by the integer field `order_by`.
    /// Documents without a numeric value for that field are not returned.
    async fn query_ordered(
        &self,
        session: &Session,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> AppResult<Vec<Document>>;

    /// Reachability check used by `/readyz`.
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
