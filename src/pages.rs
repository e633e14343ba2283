use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tracing::{debug, instrument};

use crate::auth::dto::{ProfileResponse, PublicUser};
use crate::auth::session::{CurrentUser, RequireUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard))
}

/// Landing page; works for guests and signed-in users alike.
#[instrument(skip(user))]
pub async fn index(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    match user {
        Some(user) => {
            debug!(user_id = %user.id, username = %user.username, "index visited by user");
            Json(json!({ "page": "index", "user": PublicUser::from(&user) }))
        }
        None => {
            debug!("index visited by guest");
            Json(json!({ "page": "index", "user": null }))
        }
    }
}

/// Profile overview; session required.
#[instrument(skip(user))]
pub async fn dashboard(RequireUser(user): RequireUser) -> impl IntoResponse {
    Json(json!({ "page": "dashboard", "user": ProfileResponse::from(&user) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::store::NewUser;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::Response;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn index_renders_for_guests() {
        let resp = index(CurrentUser(None)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["page"], "index");
        assert!(body["user"].is_null());
    }

    #[tokio::test]
    async fn index_names_the_signed_in_user() {
        let state = AppState::fake();
        let user = state
            .users
            .create(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_digest: "$argon2id$fake".into(),
            })
            .await
            .expect("seed");

        let resp = index(CurrentUser(Some(user))).await.into_response();
        let body = body_json(resp).await;
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("password_digest").is_none());
    }

    #[tokio::test]
    async fn dashboard_shows_profile_with_timestamps() {
        let state = AppState::fake();
        let user = state
            .users
            .create(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_digest: "$argon2id$fake".into(),
            })
            .await
            .expect("seed");
        state.users.touch_last_login(user.id).await.expect("touch");
        let user = state
            .users
            .find_by_id(user.id)
            .await
            .expect("lookup")
            .expect("present");

        let resp = dashboard(RequireUser(user)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["user"]["email"], "alice@example.com");
        let created_at = body["user"]["created_at"].as_str().expect("rfc3339 string");
        assert!(created_at.contains('T'));
        assert!(body["user"]["last_login_at"].is_string());
    }
}
