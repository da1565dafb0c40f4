use axum::{extract::State, Extension, Json};

use crate::auth::jwt::{create_id_token, IdToken};
use crate::dto::{ConfirmPasswordResetRequest, Credentials, MessageResponse, PasswordResetRequest};
use crate::error::AppResult;
use crate::models::user::Session;
use crate::server::AppState;

// ── POST /v1/accounts/signup ─────────────────────────────────────────────────

pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<Json<IdToken>> {
    let creds = Credentials::normalized(&body.email, &body.password)?;
    let session = state.auth.create_user(&creds.email, &creds.password).await?;
    let token = create_id_token(session.user_id.as_str(), &session.email, &state.config)?;
    Ok(Json(token))
}

// ── POST /v1/accounts/signin ─────────────────────────────────────────────────

pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<Json<IdToken>> {
    let creds = Credentials::normalized(&body.email, &body.password)?;
    let session = state.auth.sign_in(&creds.email, &creds.password).await?;
    let token = create_id_token(session.user_id.as_str(), &session.email, &state.config)?;
    Ok(Json(token))
}

// ── POST /v1/accounts/password-reset ─────────────────────────────────────────

pub async fn password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequest>,
) -> AppResult<Json<MessageResponse>> {
    let req = PasswordResetRequest::normalized(&body.email)?;
    state.auth.send_password_reset(&req.email).await?;
    Ok(Json(MessageResponse {
        message: "Reset link sent to your email".into(),
    }))
}

// ── POST /v1/accounts/password-reset/confirm ─────────────────────────────────

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ConfirmPasswordResetRequest>,
) -> AppResult<Json<MessageResponse>> {
    let req = ConfirmPasswordResetRequest::normalized(&body.token, &body.new_password)?;
    state
        .auth
        .confirm_password_reset(&req.token, &req.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password updated".into(),
    }))
}

// ── DELETE /v1/accounts/me ───────────────────────────────────────────────────

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<MessageResponse>> {
    state.auth.delete_user(&session).await?;
    Ok(Json(MessageResponse {
        message: "Account deleted".into(),
    }))
}
