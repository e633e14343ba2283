use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::forms::{taken_message, FieldErrors};
use crate::store::StoreError;

/// Request-level error taxonomy.
///
/// Validation and uniqueness problems render as structured field feedback;
/// anything unexpected is logged in full here and leaves the process as a
/// generic response with no internal detail.
#[derive(Debug, Error)]
pub enum AppError {
    /// User-correctable input problems, keyed by field.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// A unique value was claimed by a concurrent writer at insert time.
    #[error("{field} already taken")]
    Conflict { field: &'static str },

    /// Bad credentials. Deliberately carries no detail about which check
    /// failed.
    #[error("invalid username or password")]
    Unauthorized,

    /// An anonymous caller hit a route that needs a session. Resolved by
    /// redirecting to the login page, keeping the intended destination.
    #[error("login required")]
    LoginRequired { next: String },

    #[error(transparent)]
    Storage(StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            // An insert lost the uniqueness race; same field feedback as the
            // advisory check, different status.
            StoreError::Conflict { field } => AppError::Conflict { field },
            other => AppError::Storage(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "validation failed", "fields": fields })),
            )
                .into_response(),
            AppError::Conflict { field } => {
                let fields = FieldErrors::from([(field, vec![taken_message(field).to_string()])]);
                (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "validation failed", "fields": fields })),
                )
                    .into_response()
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid username or password" })),
            )
                .into_response(),
            AppError::LoginRequired { next } => {
                Redirect::to(&format!("/auth/login?next={}", urlencoding::encode(&next)))
                    .into_response()
            }
            AppError::Storage(e) => {
                error!(error = %e, "storage error");
                generic_server_error()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                generic_server_error()
            }
        }
    }
}

fn generic_server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn validation_error_renders_field_map() {
        let mut fields = FieldErrors::new();
        fields.insert("username", vec!["Username is required".to_string()]);
        let resp = AppError::Validation(fields).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["fields"]["username"][0], "Username is required");
    }

    #[tokio::test]
    async fn conflict_names_the_taken_field() {
        let resp = AppError::Conflict { field: "email" }.into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = body_json(resp).await;
        assert_eq!(body["fields"]["email"][0], "Please use a different email address.");
    }

    #[tokio::test]
    async fn unauthorized_is_generic() {
        let resp = AppError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Invalid username or password");
    }

    #[tokio::test]
    async fn login_required_redirects_with_encoded_next() {
        let resp = AppError::LoginRequired {
            next: "/dashboard?tab=2".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers()[LOCATION],
            "/auth/login?next=%2Fdashboard%3Ftab%3D2"
        );
    }

    #[tokio::test]
    async fn storage_error_stays_generic() {
        let resp = AppError::from(StoreError::Database(sqlx::Error::PoolClosed)).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn store_conflict_becomes_conflict_not_storage() {
        let err = AppError::from(StoreError::Conflict { field: "username" });
        assert!(matches!(err, AppError::Conflict { field: "username" }));
    }
}
