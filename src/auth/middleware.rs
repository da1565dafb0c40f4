use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::models::user::{Session, UserId};
use crate::server::AppState;

/// Resolve the bearer id token into a [`Session`] request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?;

    let token_data = verify_token(token, &state.config)?;

    let session = Session {
        user_id: UserId::new(token_data.claims.sub),
        email: token_data.claims.email,
        id_token: Some(token.to_string()),
    };

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
