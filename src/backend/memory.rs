//! In-process collaborators for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::notify::MemoryOutbox;
use super::{
    AuthProvider, DocumentStore, ResetNotifier, EMAIL_IN_USE, INVALID_CREDENTIAL,
    INVALID_RESET_TOKEN, NO_USER_RECORD,
};
use crate::auth::jwt::hash_token;
use crate::auth::password::generate_reset_token;
use crate::error::{AppError, AppResult};
use crate::models::document::{CollectionPath, Direction, Document, DocumentPath, Fields};
use crate::models::user::{Session, UserId};

struct Account {
    user_id: UserId,
    password_digest: String,
}

struct PendingReset {
    email: String,
    expires_at: DateTime<Utc>,
    used: bool,
}

const DEFAULT_RESET_TTL_SECS: i64 = 3600;

#[derive(Clone)]
pub struct MemoryAuth {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    resets: Arc<Mutex<HashMap<String, PendingReset>>>,
    reset_ttl_secs: i64,
    outbox: MemoryOutbox,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self {
            accounts: Arc::default(),
            resets: Arc::default(),
            reset_ttl_secs: DEFAULT_RESET_TTL_SECS,
            outbox: MemoryOutbox::new(),
        }
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reset_ttl(mut self, secs: i64) -> Self {
        self.reset_ttl_secs = secs;
        self
    }

    pub async fn has_user(&self, email: &str) -> bool {
        self.accounts.lock().await.contains_key(email)
    }

    /// Reset tokens handed out so far, newest last.
    pub fn outbox(&self) -> &MemoryOutbox {
        &self.outbox
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn create_user(&self, email: &str, password: &str) -> AppResult<Session> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            return Err(AppError::Remote(EMAIL_IN_USE.into()));
        }

        let user_id = UserId::new(Uuid::new_v4().simple().to_string());
        accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                password_digest: hash_token(password),
            },
        );

        Ok(Session {
            user_id,
            email: email.to_string(),
            id_token: None,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let accounts = self.accounts.lock().await;
        let account = accounts
            .get(email)
            .filter(|a| a.password_digest == hash_token(password))
            .ok_or_else(|| AppError::Remote(INVALID_CREDENTIAL.into()))?;

        Ok(Session {
            user_id: account.user_id.clone(),
            email: email.to_string(),
            id_token: None,
        })
    }

    async fn delete_user(&self, session: &Session) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        let before = accounts.len();
        accounts.retain(|_, account| account.user_id != session.user_id);
        if accounts.len() == before {
            return Err(AppError::Remote(NO_USER_RECORD.into()));
        }
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        if !self.accounts.lock().await.contains_key(email) {
            return Err(AppError::Remote(NO_USER_RECORD.into()));
        }

        let token = generate_reset_token();
        self.resets.lock().await.insert(
            hash_token(&token),
            PendingReset {
                email: email.to_string(),
                expires_at: Utc::now() + Duration::seconds(self.reset_ttl_secs),
                used: false,
            },
        );
        self.outbox.deliver(email, &token).await
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        let mut resets = self.resets.lock().await;
        let pending = resets
            .get_mut(&hash_token(token))
            .filter(|r| !r.used && r.expires_at > Utc::now())
            .ok_or_else(|| AppError::Remote(INVALID_RESET_TOKEN.into()))?;
        pending.used = true;

        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(&pending.email)
            .ok_or_else(|| AppError::Remote(NO_USER_RECORD.into()))?;
        account.password_digest = hash_token(new_password);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryDocuments {
    collections: Arc<Mutex<HashMap<CollectionPath, Vec<Document>>>>,
    calls: Arc<AtomicUsize>,
    write_failure: Arc<Mutex<Option<String>>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total collaborator calls received, reads and writes alike.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with `message` until cleared.
    pub async fn fail_writes(&self, message: &str) {
        *self.write_failure.lock().await = Some(message.to_string());
    }

    pub async fn clear_failure(&self) {
        *self.write_failure.lock().await = None;
    }

    pub async fn get(&self, path: &DocumentPath) -> Option<Fields> {
        self.collections
            .lock()
            .await
            .get(path.parent())?
            .iter()
            .find(|doc| doc.id == path.id())
            .map(|doc| doc.fields.clone())
    }

    async fn check_write(&self) -> AppResult<()> {
        match self.write_failure.lock().await.as_ref() {
            Some(message) => Err(AppError::Remote(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn set_document(
        &self,
        _session: &Session,
        path: &DocumentPath,
        fields: Fields,
    ) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_write().await?;

        let mut collections = self.collections.lock().await;
        let docs = collections.entry(path.parent().clone()).or_default();
        match docs.iter_mut().find(|doc| doc.id == path.id()) {
            Some(existing) => existing.fields = fields,
            None => docs.push(Document {
                id: path.id().to_string(),
                fields,
            }),
        }
        Ok(())
    }

    async fn add_document(
        &self,
        _session: &Session,
        collection: &CollectionPath,
        fields: Fields,
    ) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_write().await?;

        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .lock()
            .await
            .entry(collection.clone())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn query_ordered(
        &self,
        _session: &Session,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> AppResult<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let collections = self.collections.lock().await;
        let mut keyed: Vec<(i64, Document)> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter_map(|doc| {
                        let key = doc.fields.get(order_by)?.as_i64()?;
                        Some((key, doc.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        match direction {
            Direction::Ascending => keyed.sort_by_key(|(key, _)| *key),
            Direction::Descending => keyed.sort_by(|(a, _), (b, _)| b.cmp(a)),
        }
        Ok(keyed.into_iter().map(|(_, doc)| doc).collect())
    }
}
