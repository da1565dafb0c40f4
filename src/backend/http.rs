//! Client for a remote `moodlens-api` deployment.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{AuthProvider, DocumentStore};
use crate::auth::jwt::IdToken;
use crate::dto::{
    AddDocumentResponse, ConfirmPasswordResetRequest, Credentials, ErrorResponse,
    PasswordResetRequest, QueryParams, QueryResponse, WriteDocumentRequest,
};
use crate::error::{AppError, AppResult};
use crate::models::document::{CollectionPath, Direction, Document, DocumentPath, Fields};
use crate::models::user::{Session, UserId};

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> AppResult<RequestBuilder> {
        let token = session.id_token.as_deref().ok_or(AppError::Unauthenticated)?;
        Ok(builder.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = builder.send().await.map_err(remote)?;
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(remote)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> AppResult<()> {
        let response = builder.send().await.map_err(remote)?;
        check_status(response).await?;
        Ok(())
    }

    async fn exchange(&self, path: &str, email: &str, password: &str) -> AppResult<Session> {
        let body = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token: IdToken = self
            .send(self.client.post(self.url(path)).json(&body))
            .await?;

        Ok(Session {
            user_id: UserId::new(token.user_id),
            email: token.email,
            id_token: Some(token.id_token),
        })
    }
}

fn remote(e: reqwest::Error) -> AppError {
    AppError::Remote(e.to_string())
}

/// Turn a non-success response into `Remote` carrying the server's message.
async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("Request failed with status {}", status.as_u16()));
    tracing::debug!(status = status.as_u16(), message = %message, "Backend request failed");
    Err(AppError::Remote(message))
}

#[async_trait]
impl AuthProvider for HttpBackend {
    async fn create_user(&self, email: &str, password: &str) -> AppResult<Session> {
        self.exchange("/v1/accounts/signup", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        self.exchange("/v1/accounts/signin", email, password).await
    }

    async fn delete_user(&self, session: &Session) -> AppResult<()> {
        let builder = self.authorized(self.client.delete(self.url("/v1/accounts/me")), session)?;
        self.send_empty(builder).await
    }

    async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        let body = PasswordResetRequest {
            email: email.to_string(),
        };
        self.send_empty(
            self.client
                .post(self.url("/v1/accounts/password-reset"))
                .json(&body),
        )
        .await
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        let body = ConfirmPasswordResetRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        self.send_empty(
            self.client
                .post(self.url("/v1/accounts/password-reset/confirm"))
                .json(&body),
        )
        .await
    }
}

#[async_trait]
impl DocumentStore for HttpBackend {
    async fn set_document(
        &self,
        session: &Session,
        path: &DocumentPath,
        fields: Fields,
    ) -> AppResult<()> {
        let builder = self
            .client
            .put(self.url(&format!("/v1/documents/{path}")))
            .json(&WriteDocumentRequest { fields });
        self.send_empty(self.authorized(builder, session)?).await
    }

    async fn add_document(
        &self,
        session: &Session,
        collection: &CollectionPath,
        fields: Fields,
    ) -> AppResult<String> {
        let builder = self
            .client
            .post(self.url(&format!("/v1/collections/{collection}")))
            .json(&WriteDocumentRequest { fields });
        let created: AddDocumentResponse = self.send(self.authorized(builder, session)?).await?;
        Ok(created.id)
    }

    async fn query_ordered(
        &self,
        session: &Session,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> AppResult<Vec<Document>> {
        let params = QueryParams {
            order_by: order_by.to_string(),
            direction,
        };
        let builder = self
            .client
            .get(self.url(&format!("/v1/collections/{collection}")))
            .query(&params);
        let result: QueryResponse = self.send(self.authorized(builder, session)?).await?;
        Ok(result.documents)
    }

    async fn ping(&self) -> AppResult<()> {
        self.send_empty(self.client.get(self.url("/readyz"))).await
    }
}
