//! # MoodLens — Request/Response DTOs
//!
//! Wire shapes shared by the REST handlers and the HTTP backend client.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Credential checks are expressed via `validator` derive macros

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, AppResult};
use crate::models::document::{Direction, Document, Fields};

// ============================================================================
// Common
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error envelope produced by `AppError::into_response`.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: u16,
}

// ============================================================================
// Accounts
// ============================================================================

/// Email/password pair, checked locally before it reaches any provider.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Enter valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl Credentials {
    /// Trim both fields and run the format checks.
    pub fn normalized(email: &str, password: &str) -> AppResult<Self> {
        let creds = Self {
            email: email.trim().to_string(),
            password: password.trim().to_string(),
        };
        creds.validate().map_err(|e| validation_error(&e))?;
        Ok(creds)
    }
}

/// POST /v1/accounts/password-reset
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Enter your email first"))]
    pub email: String,
}

impl PasswordResetRequest {
    pub fn normalized(email: &str) -> AppResult<Self> {
        let req = Self {
            email: email.trim().to_string(),
        };
        req.validate().map_err(|e| validation_error(&e))?;
        Ok(req)
    }
}

/// POST /v1/accounts/password-reset/confirm
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmPasswordResetRequest {
    #[validate(length(min = 1, message = "Reset token is missing"))]
    pub token: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

impl ConfirmPasswordResetRequest {
    pub fn normalized(token: &str, new_password: &str) -> AppResult<Self> {
        let req = Self {
            token: token.trim().to_string(),
            new_password: new_password.trim().to_string(),
        };
        req.validate().map_err(|e| validation_error(&e))?;
        Ok(req)
    }
}

/// First message per field, in form order, for display inline.
pub fn validation_error(errors: &ValidationErrors) -> AppError {
    let field_errors = errors.field_errors();
    let message = ["email", "password", "token", "new_password"]
        .iter()
        .filter_map(|field| field_errors.get(field))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string());
    AppError::Validation(message)
}

// ============================================================================
// Documents
// ============================================================================

/// PUT /v1/documents/*path and POST /v1/collections/*path
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteDocumentRequest {
    pub fields: Fields,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddDocumentResponse {
    pub id: String,
}

/// GET /v1/collections/*path
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryParams {
    pub order_by: String,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub documents: Vec<Document>,
}
