use axum::{
    extract::{FromRef, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginPayload, NextQuery, RegisterPayload},
        forms::{LoginForm, RegisterForm},
        password::{hash_password, verify_password},
        redirect::sanitize_next,
        session::{CurrentUser, SessionKeys},
    },
    error::AppError,
    state::AppState,
    store::NewUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", get(register_form).post(register))
        .route("/auth/login", get(login_form).post(login))
        .route("/auth/logout", get(logout))
}

// --- handlers ---

#[instrument(skip(state, user))]
pub async fn login_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(&state.config.default_redirect).into_response();
    }
    Json(json!({
        "title": "Sign In",
        "fields": ["username", "password", "remember"],
        "next": query.next,
    }))
    .into_response()
}

#[instrument(skip(state, user, payload))]
pub async fn login(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NextQuery>,
    Form(payload): Form<LoginPayload>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to(&state.config.default_redirect).into_response());
    }

    let form = LoginForm::validate(&payload).map_err(AppError::Validation)?;

    // One arm for every way the credentials can be wrong, so the response
    // never says which part was.
    let user = match state.users.find_by_username(&form.username).await? {
        Some(user) if user.is_active && verify_password(&form.password, &user.password_digest) => {
            user
        }
        _ => {
            warn!(username = %form.username, "failed login attempt");
            return Err(AppError::Unauthorized);
        }
    };

    state.users.touch_last_login(user.id).await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.issue(user.id, form.remember)?;
    let target = sanitize_next(
        query.next.as_deref(),
        &state.config.site_origin,
        &state.config.default_redirect,
    );
    info!(user_id = %user.id, username = %user.username, "user signed in");

    let mut response = Redirect::to(&target).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        keys.session_cookie(&token, form.remember)
            .parse()
            .map_err(anyhow::Error::from)?,
    );
    Ok(response)
}

#[instrument(skip(state, user))]
pub async fn register_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    if user.is_some() {
        return Redirect::to(&state.config.default_redirect).into_response();
    }
    Json(json!({
        "title": "Register",
        "fields": ["username", "email", "password", "confirm_password"],
    }))
    .into_response()
}

#[instrument(skip(state, user, payload))]
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(payload): Form<RegisterPayload>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to(&state.config.default_redirect).into_response());
    }

    let form = RegisterForm::validate(&payload, state.users.as_ref())
        .await?
        .map_err(AppError::Validation)?;

    let digest = hash_password(&form.password)?;
    let user = state
        .users
        .create(NewUser {
            username: form.username,
            email: form.email,
            password_digest: digest,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Redirect::to("/auth/login").into_response())
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    if let Some(user) = &user {
        info!(user_id = %user.id, username = %user.username, "user signed out");
    }

    // Clearing the cookie needs no live session; a stale or absent one gets
    // the same treatment.
    let keys = SessionKeys::from_ref(&state);
    let mut response = Redirect::to("/").into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        keys.clear_cookie().parse().map_err(anyhow::Error::from)?,
    );
    Ok(response)
}
