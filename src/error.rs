use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single error taxonomy shared by the repository layer, the identity
/// resolver, and the handlers. Every failure path in the application maps to
/// exactly one of these variants, which in turn maps to one HTTP status and a
/// `{"error": "<message>"}` JSON body.
///
/// Validation-class errors (`UnknownCategory`, `Validation`, `Conflict`) are
/// detected *before* any mutation, so a rejected request never leaves partial
/// state behind.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The bearer token is missing, malformed, expired, or has a bad signature.
    #[error("missing or invalid credentials")]
    Unauthenticated,

    /// The token verified, but no local user row exists for its subject id.
    /// The caller must complete signup before using authenticated endpoints.
    #[error("account not provisioned; complete signup first")]
    UserNotProvisioned,

    /// An addressed entity (post, category) does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// One or more submitted category ids do not reference an existing category.
    #[error("one or more of the given category ids do not exist")]
    UnknownCategory,

    /// A request payload failed boundary validation.
    #[error("{0}")]
    Validation(String),

    /// A uniqueness rule was violated (duplicate name/email at signup).
    #[error("{0}")]
    Conflict(String),

    /// An underlying database failure. Logged in full, surfaced generically.
    #[error("storage failure")]
    Store(#[from] sqlx::Error),
}

impl ApiError {
    /// Maps each variant to its wire status classification.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::UserNotProvisioned => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnknownCategory | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Store failures carry internal detail (SQL, connection info) that must
        // not leak to the client; log it here and send the generic message.
        if let ApiError::Store(ref e) = self {
            tracing::error!(error = ?e, "database operation failed");
        }

        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
