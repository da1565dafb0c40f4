//! Identity gateway: sign-in, sign-up with profile provisioning, sign-out,
//! and the locally cached session.

use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::backend::{AuthProvider, DocumentStore};
use crate::dto::{ConfirmPasswordResetRequest, Credentials, PasswordResetRequest};
use crate::error::AppResult;
use crate::models::document::user_document;
use crate::models::user::{Session, UserId, UserProfile};

#[derive(Clone)]
pub struct IdentityGateway {
    auth: Arc<dyn AuthProvider>,
    documents: Arc<dyn DocumentStore>,
    current: Arc<RwLock<Option<Session>>>,
}

impl IdentityGateway {
    pub fn new(auth: Arc<dyn AuthProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            auth,
            documents,
            current: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<UserId> {
        let creds = Credentials::normalized(email, password)?;
        let session = self.auth.sign_in(&creds.email, &creds.password).await?;
        let user_id = session.user_id.clone();

        tracing::info!(user_id = %user_id, "Signed in");
        self.store_session(Some(session));
        Ok(user_id)
    }

    /// Create the credential, then write `users/{uid}`. If the profile write
    /// fails the credential is deleted again and the profile error returned.
    pub async fn sign_up(&self, email: &str, password: &str) -> AppResult<UserId> {
        let creds = Credentials::normalized(email, password)?;
        let session = self.auth.create_user(&creds.email, &creds.password).await?;

        let profile = UserProfile::new(&creds.email, Utc::now().timestamp_millis());
        let path = user_document(session.user_id.as_str());

        if let Err(e) = self
            .documents
            .set_document(&session, &path, profile.to_fields())
            .await
        {
            tracing::warn!(user_id = %session.user_id, error = %e, "Profile write failed, removing credential");
            if let Err(cleanup) = self.auth.delete_user(&session).await {
                tracing::warn!(
                    user_id = %session.user_id,
                    error = %cleanup,
                    "Orphaned credential left behind"
                );
            }
            return Err(e);
        }

        let user_id = session.user_id.clone();
        tracing::info!(user_id = %user_id, "Signed up");
        self.store_session(Some(session));
        Ok(user_id)
    }

    pub async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        let req = PasswordResetRequest::normalized(email)?;
        self.auth.send_password_reset(&req.email).await
    }

    /// Set a new password with a token from a reset message. The cached
    /// session is left alone.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        let req = ConfirmPasswordResetRequest::normalized(token, new_password)?;
        self.auth
            .confirm_password_reset(&req.token, &req.new_password)
            .await
    }

    pub fn logout(&self) {
        self.store_session(None);
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_session().is_some()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.current_session().map(|s| s.user_id)
    }

    /// Snapshot of the cached session, for handing to the entry store.
    pub fn current_session(&self) -> Option<Session> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_session(&self, session: Option<Session>) {
        match self.current.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}
