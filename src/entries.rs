use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::backend::DocumentStore;
use crate::error::{AppError, AppResult};
use crate::models::document::{mood_collection, Direction};
use crate::models::mood::{MoodHistory, NewMoodEntry};
use crate::models::user::{Session, UserId};

const ORDER_FIELD: &str = "timestamp";

/// Per-user cache slot. `generation` moves on every successful write so a
/// read that started before the write cannot store what it fetched.
#[derive(Default)]
struct CachedHistory {
    generation: u64,
    history: Option<MoodHistory>,
}

type HistoryCache = Arc<Mutex<HashMap<UserId, CachedHistory>>>;

/// Append-only mood check-ins under `users/{uid}/moods`.
#[derive(Clone)]
pub struct EntryStore {
    documents: Arc<dyn DocumentStore>,
    cache: Option<HistoryCache>,
}

impl EntryStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            documents,
            cache: None,
        }
    }

    /// Serve repeat history reads from memory until the user's next write.
    pub fn with_history_cache(mut self) -> Self {
        self.cache = Some(Arc::new(Mutex::new(HashMap::new())));
        self
    }

    pub async fn save_mood_entry(
        &self,
        session: Option<&Session>,
        draft: NewMoodEntry,
    ) -> AppResult<()> {
        let session = session.ok_or(AppError::Unauthenticated)?;

        let entry = draft.into_entry(Utc::now().timestamp_millis());
        let collection = mood_collection(session.user_id.as_str());
        let id = self
            .documents
            .add_document(session, &collection, entry.to_fields())
            .await?;

        tracing::debug!(user_id = %session.user_id, entry_id = %id, mood = %entry.mood_label, "Mood entry saved");

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().await;
            let slot = cache.entry(session.user_id.clone()).or_default();
            slot.generation += 1;
            slot.history = None;
        }
        Ok(())
    }

    /// Every entry for the session's user, newest first.
    pub async fn get_mood_history(&self, session: Option<&Session>) -> AppResult<MoodHistory> {
        let session = session.ok_or(AppError::Unauthenticated)?;

        let seen_generation = match &self.cache {
            Some(cache) => {
                let mut cache = cache.lock().await;
                let slot = cache.entry(session.user_id.clone()).or_default();
                if let Some(hit) = &slot.history {
                    return Ok(hit.clone());
                }
                Some(slot.generation)
            }
            None => None,
        };

        let collection = mood_collection(session.user_id.as_str());
        let documents = self
            .documents
            .query_ordered(session, &collection, ORDER_FIELD, Direction::Descending)
            .await?;

        let history = MoodHistory::from_documents(documents);
        if !history.skipped.is_empty() {
            tracing::warn!(
                user_id = %session.user_id,
                skipped = history.skipped.len(),
                "Mood history contained unreadable records"
            );
        }

        if let (Some(cache), Some(seen)) = (&self.cache, seen_generation) {
            let mut cache = cache.lock().await;
            match cache.get_mut(&session.user_id) {
                Some(slot) if slot.generation == seen => slot.history = Some(history.clone()),
                _ => tracing::debug!(user_id = %session.user_id, "History written during read, not cached"),
            }
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryDocuments;
    use crate::models::document::{CollectionPath, Document, DocumentPath, Fields};
    use crate::models::mood::{Mood, SkipReason};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::oneshot;

    /// Holds the first ordered read after it has fetched, until released.
    struct PausedRead {
        inner: MemoryDocuments,
        gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    }

    #[async_trait]
    impl DocumentStore for PausedRead {
        async fn set_document(
            &self,
            session: &Session,
            path: &DocumentPath,
            fields: Fields,
        ) -> AppResult<()> {
            self.inner.set_document(session, path, fields).await
        }

        async fn add_document(
            &self,
            session: &Session,
            collection: &CollectionPath,
            fields: Fields,
        ) -> AppResult<String> {
            self.inner.add_document(session, collection, fields).await
        }

        async fn query_ordered(
            &self,
            session: &Session,
            collection: &CollectionPath,
            order_by: &str,
            direction: Direction,
        ) -> AppResult<Vec<Document>> {
            let docs = self
                .inner
                .query_ordered(session, collection, order_by, direction)
                .await?;
            let gate = self.gate.lock().await.take();
            if let Some((fetched, release)) = gate {
                let _ = fetched.send(());
                let _ = release.await;
            }
            Ok(docs)
        }
    }

    fn session(uid: &str) -> Session {
        Session {
            user_id: UserId::new(uid),
            email: format!("{uid}@example.com"),
            id_token: None,
        }
    }

    fn store() -> (EntryStore, MemoryDocuments) {
        let docs = MemoryDocuments::new();
        (EntryStore::new(Arc::new(docs.clone())), docs)
    }

    #[tokio::test]
    async fn test_saved_entry_comes_back_first() {
        let (store, _) = store();
        let s = session("u1");
        store
            .save_mood_entry(Some(&s), NewMoodEntry::new(Mood::Okay).note("older"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let before = Utc::now().timestamp_millis();
        let draft = NewMoodEntry::new(Mood::Great)
            .note("  slept well ")
            .metrics(10, 90, 80);
        store.save_mood_entry(Some(&s), draft).await.unwrap();

        let history = store.get_mood_history(Some(&s)).await.unwrap();
        let latest = history.latest().unwrap();
        assert_eq!(latest.mood, "😄");
        assert_eq!(latest.mood_label, "Great");
        assert_eq!(latest.note, "slept well");
        assert_eq!((latest.stress, latest.energy, latest.sleep), (10, 90, 80));
        assert!(latest.timestamp >= before);
    }

    #[tokio::test]
    async fn test_history_sorted_newest_first_regardless_of_insert_order() {
        let (store, docs) = store();
        let s = session("u1");
        let moods = mood_collection("u1");
        for ts in [200, 50, 900, 400] {
            let fields = json!({ "mood": "🙂", "timestamp": ts });
            docs.add_document(&s, &moods, fields.as_object().cloned().unwrap())
                .await
                .unwrap();
        }

        let history = store.get_mood_history(Some(&s)).await.unwrap();
        let stamps: Vec<i64> = history.entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![900, 400, 200, 50]);
        assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_no_session_fails_without_remote_call() {
        let (store, docs) = store();

        let save = store.save_mood_entry(None, NewMoodEntry::default()).await;
        assert!(matches!(save, Err(AppError::Unauthenticated)));

        let read = store.get_mood_history(None).await;
        assert!(matches!(read, Err(AppError::Unauthenticated)));

        assert_eq!(docs.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_note_round_trips_as_empty() {
        let (store, _) = store();
        let s = session("u1");
        store
            .save_mood_entry(Some(&s), NewMoodEntry::new(Mood::Low).note(""))
            .await
            .unwrap();

        let history = store.get_mood_history(Some(&s)).await.unwrap();
        assert_eq!(history.entries[0].note, "");
    }

    #[tokio::test]
    async fn test_record_without_mood_is_skipped_others_kept() {
        let (store, docs) = store();
        let s = session("u1");
        let moods = mood_collection("u1");
        store
            .save_mood_entry(Some(&s), NewMoodEntry::new(Mood::Angry))
            .await
            .unwrap();
        let broken = json!({ "note": "no mood here", "timestamp": 1 });
        let broken_id = docs
            .add_document(&s, &moods, broken.as_object().cloned().unwrap())
            .await
            .unwrap();

        let history = store.get_mood_history(Some(&s)).await.unwrap();
        assert_eq!(history.entries.len(), 1);
        assert_eq!(history.entries[0].mood_label, "Angry");
        assert_eq!(history.skipped.len(), 1);
        assert_eq!(history.skipped[0].document_id, broken_id);
        assert_eq!(history.skipped[0].reason, SkipReason::MissingMood);
    }

    #[tokio::test]
    async fn test_users_are_partitioned() {
        let (store, _) = store();
        let alice = session("alice");
        let bob = session("bob");
        store
            .save_mood_entry(Some(&alice), NewMoodEntry::new(Mood::Great))
            .await
            .unwrap();

        let bobs = store.get_mood_history(Some(&bob)).await.unwrap();
        assert!(bobs.is_empty());
        assert!(bobs.skipped.is_empty());
        assert_eq!(store.get_mood_history(Some(&alice)).await.unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_passes_message_through() {
        let (store, docs) = store();
        docs.fail_writes("Quota exceeded.").await;
        let err = store
            .save_mood_entry(Some(&session("u1")), NewMoodEntry::default())
            .await
            .unwrap_err();
        assert!(matches!(&err, AppError::Remote(msg) if msg == "Quota exceeded."));
    }

    #[tokio::test]
    async fn test_history_cache_hits_until_next_write() {
        let docs = MemoryDocuments::new();
        let store = EntryStore::new(Arc::new(docs.clone())).with_history_cache();
        let s = session("u1");

        store.get_mood_history(Some(&s)).await.unwrap();
        store.get_mood_history(Some(&s)).await.unwrap();
        assert_eq!(docs.calls(), 1, "second read should be served from cache");

        store
            .save_mood_entry(Some(&s), NewMoodEntry::default())
            .await
            .unwrap();
        let history = store.get_mood_history(Some(&s)).await.unwrap();
        assert_eq!(history.entries.len(), 1);
        assert_eq!(docs.calls(), 3);
    }

    #[tokio::test]
    async fn test_read_overlapping_write_does_not_cache_old_history() {
        let (fetched_tx, fetched_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let paused = PausedRead {
            inner: MemoryDocuments::new(),
            gate: Mutex::new(Some((fetched_tx, release_rx))),
        };
        let store = EntryStore::new(Arc::new(paused)).with_history_cache();
        let s = session("u1");

        let reader = tokio::spawn({
            let store = store.clone();
            let s = s.clone();
            async move { store.get_mood_history(Some(&s)).await }
        });
        fetched_rx.await.unwrap();

        store
            .save_mood_entry(Some(&s), NewMoodEntry::new(Mood::Great))
            .await
            .unwrap();
        release_tx.send(()).unwrap();

        let overlapped = reader.await.unwrap().unwrap();
        assert!(overlapped.is_empty());

        let after_write = store.get_mood_history(Some(&s)).await.unwrap();
        assert_eq!(after_write.entries.len(), 1);
        assert_eq!(after_write.entries[0].mood_label, "Great");
    }
}
