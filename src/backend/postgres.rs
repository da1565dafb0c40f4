//! PostgreSQL-backed identity provider and document database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    AuthProvider, DocumentStore, ResetNotifier, EMAIL_IN_USE, INVALID_CREDENTIAL,
    INVALID_RESET_TOKEN, NO_USER_RECORD,
};
use crate::auth::jwt::hash_token;
use crate::auth::password::{generate_reset_token, hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::models::document::{CollectionPath, Direction, Document, DocumentPath, Fields};
use crate::models::user::{Session, UserId};

/// Order keys must be JSON integers, matching `Value::as_i64` on the
/// in-memory store. `1.0` and `7.5` are both left out.
const INTEGER_ORDER_KEY: &str =
    "jsonb_typeof(fields -> $2) = 'number' AND (fields ->> $2) ~ '^-?[0-9]{1,18}$'";

#[derive(Clone)]
pub struct PostgresBackend {
    db: PgPool,
    reset_ttl_secs: i64,
    notifier: Arc<dyn ResetNotifier>,
}

impl PostgresBackend {
    pub fn new(db: PgPool, reset_ttl_secs: i64, notifier: Arc<dyn ResetNotifier>) -> Self {
        Self {
            db,
            reset_ttl_secs,
            notifier,
        }
    }
}

fn session_for(id: Uuid, email: &str) -> Session {
    Session {
        user_id: UserId::new(id.to_string()),
        email: email.to_string(),
        id_token: None,
    }
}

#[async_trait]
impl AuthProvider for PostgresBackend {
    async fn create_user(&self, email: &str, password: &str) -> AppResult<Session> {
        let pwd_hash = hash_password(password)?;

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO accounts (id, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(&pwd_hash)
        .fetch_optional(&self.db)
        .await?;

        let id = inserted.ok_or_else(|| AppError::Remote(EMAIL_IN_USE.into()))?;
        tracing::info!(user_id = %id, "Account created");
        Ok(session_for(id, email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let (id, password_hash) = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, password_hash FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Remote(INVALID_CREDENTIAL.into()))?;

        if !verify_password(password, &password_hash)? {
            return Err(AppError::Remote(INVALID_CREDENTIAL.into()));
        }

        Ok(session_for(id, email))
    }

    async fn delete_user(&self, session: &Session) -> AppResult<()> {
        let id = Uuid::parse_str(session.user_id.as_str())
            .map_err(|_| AppError::Remote(NO_USER_RECORD.into()))?;

        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Remote(NO_USER_RECORD.into()));
        }
        tracing::info!(user_id = %id, "Account deleted");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        let account_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::Remote(NO_USER_RECORD.into()))?;

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::seconds(self.reset_ttl_secs);

        sqlx::query(
            r#"
            INSERT INTO password_resets (id, account_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        tracing::info!(account_id = %account_id, expires_at = %expires_at, "Password reset issued");
        self.notifier.deliver(email, &token).await
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AppResult<()> {
        let pwd_hash = hash_password(new_password)?;

        let mut tx = self.db.begin().await?;

        let account_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE password_resets SET used_at = NOW()
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            RETURNING account_id
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Remote(INVALID_RESET_TOKEN.into()))?;

        sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(account_id)
            .bind(&pwd_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(account_id = %account_id, "Password reset completed");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresBackend {
    async fn set_document(
        &self,
        _session: &Session,
        path: &DocumentPath,
        fields: Fields,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET
                fields = EXCLUDED.fields,
                updated_at = NOW()
            "#,
        )
        .bind(path.parent().to_string())
        .bind(path.id())
        .bind(Value::Object(fields))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn add_document(
        &self,
        _session: &Session,
        collection: &CollectionPath,
        fields: Fields,
    ) -> AppResult<String> {
        let id = Uuid::new_v4().simple().to_string();

        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)")
            .bind(collection.to_string())
            .bind(&id)
            .bind(Value::Object(fields))
            .execute(&self.db)
            .await?;

        Ok(id)
    }

    async fn query_ordered(
        &self,
        _session: &Session,
        collection: &CollectionPath,
        order_by: &str,
        direction: Direction,
    ) -> AppResult<Vec<Document>> {
        let order = match direction {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        };
        let sql = format!(
            "SELECT id, fields FROM documents \
             WHERE collection = $1 AND {INTEGER_ORDER_KEY} \
             ORDER BY (fields ->> $2)::bigint {order}"
        );

        let rows = sqlx::query_as::<_, (String, Value)>(&sql)
            .bind(collection.to_string())
            .bind(order_by)
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, fields)| Document {
                id,
                fields: match fields {
                    Value::Object(map) => map,
                    _ => Fields::new(),
                },
            })
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}
