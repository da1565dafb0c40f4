use std::sync::Arc;

use moodlens_api::backend::http::HttpBackend;
use moodlens_api::backend::memory::{MemoryAuth, MemoryDocuments};
use moodlens_api::backend::{INVALID_CREDENTIAL, INVALID_RESET_TOKEN};
use moodlens_api::config::{ClientConfig, Config};
use moodlens_api::models::mood::{Mood, NewMoodEntry};
use moodlens_api::server::{self, AppState};
use moodlens_api::{AppError, MoodLens};

fn config() -> Config {
    Config {
        database_url: String::new(),
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        jwt_secret: "integration-secret".into(),
        jwt_ttl_secs: 600,
        password_reset_ttl_secs: 600,
        password_reset_webhook_url: None,
        auth_rate_limit_per_minute: 100,
    }
}

/// Start a server on an ephemeral port backed by in-memory collaborators.
async fn spawn_server() -> (String, MemoryDocuments) {
    let (base_url, _, docs) = spawn_server_with_auth().await;
    (base_url, docs)
}

async fn spawn_server_with_auth() -> (String, MemoryAuth, MemoryDocuments) {
    let auth = MemoryAuth::new();
    let docs = MemoryDocuments::new();
    let state = AppState::new(
        Arc::new(auth.clone()),
        Arc::new(docs.clone()),
        Arc::new(config()),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, server::router(state)));
    (format!("http://{addr}"), auth, docs)
}

#[tokio::test]
async fn test_check_in_round_trip_over_http() {
    let (base_url, docs) = spawn_server().await;
    let client = MoodLens::connect(&ClientConfig {
        backend_url: base_url,
        history_cache: false,
    });

    let uid = client
        .identity
        .sign_up("a@b.com", "validpass")
        .await
        .unwrap();
    let profile = docs
        .get(&moodlens_api::models::document::user_document(uid.as_str()))
        .await
        .unwrap();
    assert_eq!(profile["name"], "a");

    client
        .check_in(NewMoodEntry::new(Mood::Okay).note("first"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    client
        .check_in(NewMoodEntry::new(Mood::Great).note("").metrics(5, 95, 70))
        .await
        .unwrap();

    let history = client.history().await.unwrap();
    assert_eq!(history.entries.len(), 2);
    let latest = history.latest().unwrap();
    assert_eq!(latest.mood_label, "Great");
    assert_eq!(latest.note, "");
    assert_eq!((latest.stress, latest.energy, latest.sleep), (5, 95, 70));
    assert!(history.entries[0].timestamp >= history.entries[1].timestamp);
}

#[tokio::test]
async fn test_wrong_password_surfaces_provider_message() {
    let (base_url, _) = spawn_server().await;
    let backend = Arc::new(HttpBackend::new(&base_url));
    let client = MoodLens::new(backend.clone(), backend);

    client
        .identity
        .sign_up("a@b.com", "validpass")
        .await
        .unwrap();
    client.identity.logout();

    let err = client
        .identity
        .login("a@b.com", "not-the-password")
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::Remote(msg) if msg == INVALID_CREDENTIAL));
    assert!(!client.identity.is_logged_in());
}

#[tokio::test]
async fn test_history_without_login_makes_no_request() {
    let (base_url, docs) = spawn_server().await;
    let client = MoodLens::connect(&ClientConfig {
        backend_url: base_url,
        history_cache: true,
    });

    assert!(matches!(
        client.history().await,
        Err(AppError::Unauthenticated)
    ));
    assert_eq!(docs.calls(), 0);
}

#[tokio::test]
async fn test_password_reset_over_http() {
    let (base_url, auth, _) = spawn_server_with_auth().await;
    let client = MoodLens::connect(&ClientConfig {
        backend_url: base_url,
        history_cache: false,
    });

    client.identity.sign_up("a@b.com", "validpass").await.unwrap();
    client.identity.logout();

    client.identity.send_password_reset("a@b.com").await.unwrap();
    let token = auth.outbox().last_token_for("a@b.com").await.unwrap();
    client
        .identity
        .confirm_password_reset(&token, "second-pass")
        .await
        .unwrap();
    client.identity.login("a@b.com", "second-pass").await.unwrap();

    let reused = client
        .identity
        .confirm_password_reset(&token, "third-pass")
        .await
        .unwrap_err();
    assert!(matches!(&reused, AppError::Remote(msg) if msg == INVALID_RESET_TOKEN));
}
