use std::sync::Arc;

use crate::backend::http::HttpBackend;
use crate::backend::{AuthProvider, DocumentStore};
use crate::config::ClientConfig;
use crate::entries::EntryStore;
use crate::error::AppResult;
use crate::gateway::IdentityGateway;
use crate::models::mood::{MoodHistory, NewMoodEntry};

/// Gateway and entry store wired to the same collaborators, with the
/// gateway's cached session handed to each store call.
#[derive(Clone)]
pub struct MoodLens {
    pub identity: IdentityGateway,
    pub entries: EntryStore,
}

impl MoodLens {
    pub fn new(auth: Arc<dyn AuthProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity: IdentityGateway::new(auth, documents.clone()),
            entries: EntryStore::new(documents),
        }
    }

    pub fn connect(config: &ClientConfig) -> Self {
        let backend = Arc::new(HttpBackend::new(&config.backend_url));
        let mut client = Self::new(backend.clone(), backend);
        if config.history_cache {
            client.entries = client.entries.with_history_cache();
        }
        client
    }

    pub async fn check_in(&self, draft: NewMoodEntry) -> AppResult<()> {
        let session = self.identity.current_session();
        self.entries.save_mood_entry(session.as_ref(), draft).await
    }

    pub async fn history(&self) -> AppResult<MoodHistory> {
        let session = self.identity.current_session();
        self.entries.get_mood_history(session.as_ref()).await
    }
}
