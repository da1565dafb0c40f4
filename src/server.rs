use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::RateLimitState;
use crate::backend::{AuthProvider, DocumentStore};
use crate::config::Config;
use crate::{auth, handlers};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
}

impl AppState {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        documents: Arc<dyn DocumentStore>,
        config: Arc<Config>,
    ) -> Self {
        let rate_limiter = RateLimitState::new(config.auth_rate_limit_per_minute);
        Self {
            auth,
            documents,
            config,
            rate_limiter,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let account_routes = Router::new()
        .route("/v1/accounts/signup", post(handlers::accounts::sign_up))
        .route("/v1/accounts/signin", post(handlers::accounts::sign_in))
        .route(
            "/v1/accounts/password-reset",
            post(handlers::accounts::password_reset),
        )
        .route(
            "/v1/accounts/password-reset/confirm",
            post(handlers::accounts::confirm_password_reset),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_accounts,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(account_routes);

    let protected_routes = Router::new()
        .route("/v1/accounts/me", delete(handlers::accounts::delete_account))
        .route("/v1/documents/*path", put(handlers::documents::set_document))
        .route(
            "/v1/collections/*path",
            post(handlers::documents::add_document).get(handlers::documents::query_collection),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = match state.config.frontend_url.parse::<axum::http::HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
            ]),
        Err(_) => {
            tracing::warn!(frontend_url = %state.config.frontend_url, "Invalid FRONTEND_URL, CORS disabled");
            CorsLayer::new()
        }
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails. Client addresses are exposed for rate limiting.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::jwt::test_config;
    use crate::backend::memory::{MemoryAuth, MemoryDocuments};
    use crate::backend::{EMAIL_IN_USE, INVALID_RESET_TOKEN};

    fn app() -> Router {
        app_with(MemoryAuth::new())
    }

    fn app_with(auth: MemoryAuth) -> Router {
        let state = AppState::new(
            Arc::new(auth),
            Arc::new(MemoryDocuments::new()),
            Arc::new(test_config()),
        );
        router(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn sign_up(app: &Router, email: &str) -> (String, String) {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/v1/accounts/signup",
                None,
                json!({ "email": email, "password": "validpass" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["id_token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "moodlens-api");
    }

    #[tokio::test]
    async fn test_add_and_query_own_collection() {
        let app = app();
        let (uid, token) = sign_up(&app, "a@b.com").await;
        let uri = format!("/v1/collections/users/{uid}/moods");

        for ts in [10, 30, 20] {
            let (status, body) = send(
                &app,
                json_request("POST", &uri, Some(&token), json!({ "fields": { "mood": "🙂", "timestamp": ts } })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert!(body["id"].is_string());
        }

        let req = Request::get(format!("{uri}?order_by=timestamp&direction=descending"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let stamps: Vec<i64> = body["documents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["fields"]["timestamp"].as_i64().unwrap())
            .collect();
        assert_eq!(stamps, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn test_missing_bearer_is_unauthorized() {
        let req = json_request("PUT", "/v1/documents/users/u1", None, json!({ "fields": {} }));
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], 401);
    }

    #[tokio::test]
    async fn test_other_users_partition_is_forbidden() {
        let app = app();
        let (_, token) = sign_up(&app, "a@b.com").await;
        let (other_uid, _) = sign_up(&app, "c@d.com").await;

        let req = json_request(
            "PUT",
            &format!("/v1/documents/users/{other_uid}"),
            Some(&token),
            json!({ "fields": { "name": "mallory" } }),
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_signup_validation_and_duplicates() {
        let app = app();
        let short = json_request(
            "POST",
            "/v1/accounts/signup",
            None,
            json!({ "email": "a@b.com", "password": "123" }),
        );
        let (status, body) = send(&app, short).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["message"], "Password must be at least 6 characters");

        sign_up(&app, "a@b.com").await;
        let dup = json_request(
            "POST",
            "/v1/accounts/signup",
            None,
            json!({ "email": "a@b.com", "password": "validpass" }),
        );
        let (status, body) = send(&app, dup).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], EMAIL_IN_USE);
    }

    #[tokio::test]
    async fn test_delete_account() {
        let app = app();
        let (_, token) = sign_up(&app, "a@b.com").await;
        let req = Request::delete("/v1/accounts/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        let signin = json_request(
            "POST",
            "/v1/accounts/signin",
            None,
            json!({ "email": "a@b.com", "password": "validpass" }),
        );
        let (status, _) = send(&app, signin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_password_reset_confirm_flow() {
        let auth = MemoryAuth::new();
        let app = app_with(auth.clone());
        sign_up(&app, "a@b.com").await;

        let (status, _) = send(
            &app,
            json_request("POST", "/v1/accounts/password-reset", None, json!({ "email": "a@b.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = auth.outbox().last_token_for("a@b.com").await.unwrap();

        let confirm = json!({ "token": token, "new_password": "brand-new" });
        let (status, _) = send(
            &app,
            json_request("POST", "/v1/accounts/password-reset/confirm", None, confirm.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/v1/accounts/signin",
                None,
                json!({ "email": "a@b.com", "password": "brand-new" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            json_request("POST", "/v1/accounts/password-reset/confirm", None, confirm),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], INVALID_RESET_TOKEN);
    }
}
