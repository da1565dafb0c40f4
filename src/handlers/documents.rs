use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::dto::{AddDocumentResponse, MessageResponse, QueryParams, QueryResponse, WriteDocumentRequest};
use crate::error::{AppError, AppResult};
use crate::models::document::{CollectionPath, DocumentPath};
use crate::models::user::Session;
use crate::server::AppState;

/// Callers may only reach paths inside their own `users/{uid}` partition.
fn ensure_owner(session: &Session, owner: Option<&str>) -> AppResult<()> {
    if owner == Some(session.user_id.as_str()) {
        Ok(())
    } else {
        tracing::warn!(user_id = %session.user_id, "Document access outside own partition");
        Err(AppError::Forbidden)
    }
}

pub async fn set_document(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(raw_path): Path<String>,
    Json(body): Json<WriteDocumentRequest>,
) -> AppResult<Json<MessageResponse>> {
    let path = DocumentPath::parse(&raw_path)?;
    ensure_owner(&session, path.owner())?;

    state
        .documents
        .set_document(&session, &path, body.fields)
        .await?;

    Ok(Json(MessageResponse {
        message: format!("Wrote {path}"),
    }))
}

pub async fn add_document(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(raw_path): Path<String>,
    Json(body): Json<WriteDocumentRequest>,
) -> AppResult<Json<AddDocumentResponse>> {
    let collection = CollectionPath::parse(&raw_path)?;
    ensure_owner(&session, collection.owner())?;

    let id = state
        .documents
        .add_document(&session, &collection, body.fields)
        .await?;

    Ok(Json(AddDocumentResponse { id }))
}

pub async fn query_collection(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(raw_path): Path<String>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<QueryResponse>> {
    let collection = CollectionPath::parse(&raw_path)?;
    ensure_owner(&session, collection.owner())?;

    let documents = state
        .documents
        .query_ordered(&session, &collection, &params.order_by, params.direction)
        .await?;

    Ok(Json(QueryResponse { documents }))
}
