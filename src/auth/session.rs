use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::SessionConfig, error::AppError, state::AppState, store::User};

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "hallpass_session";

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    /// Whether the user asked to stay signed in; drives the longer expiry.
    pub remember: bool,
}

#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub session_ttl: Duration,
    pub remember_ttl: Duration,
    pub cookie_secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            ttl_minutes,
            remember_ttl_minutes,
            cookie_secure,
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            session_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            remember_ttl: Duration::from_secs((remember_ttl_minutes as u64) * 60),
            cookie_secure,
        }
    }
}

impl SessionKeys {
    pub fn issue(&self, user_id: Uuid, remember: bool) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = if remember {
            self.remember_ttl
        } else {
            self.session_ttl
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            remember,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, remember = remember, "session issued");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        // No grace period once the expiry timestamp passes.
        validation.leeway = 0;
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session verified");
        Ok(data.claims)
    }

    /// Set-Cookie value for a fresh session. Without `remember` the cookie is
    /// session-scoped and dies with the browser; with it, Max-Age keeps it
    /// for the whole remember window.
    pub fn session_cookie(&self, token: &str, remember: bool) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, token
        );
        if remember {
            cookie.push_str(&format!("; Max-Age={}", self.remember_ttl.as_secs()));
        }
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Set-Cookie value that drops the session on the client.
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            SESSION_COOKIE
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Pull the session token out of the Cookie header, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .find_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
}

/// Resolve the request's session to a live user. Anything short of a valid
/// token for an active account resolves to `None`; only a store failure is an
/// error.
async fn resolve_session(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(token) = token_from_headers(&parts.headers) else {
        return Ok(None);
    };
    let keys = SessionKeys::from_ref(state);
    let claims = match keys.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "session token rejected");
            return Ok(None);
        }
    };
    match state.users.find_by_id(claims.sub).await? {
        Some(user) if user.is_active => Ok(Some(user)),
        Some(_) => {
            debug!(user_id = %claims.sub, "session refers to a deactivated user");
            Ok(None)
        }
        None => {
            debug!(user_id = %claims.sub, "session refers to an unknown user");
            Ok(None)
        }
    }
}

/// Extractor for routes that render differently for guests and users. Never
/// rejects over a missing or stale session.
pub struct CurrentUser(pub Option<User>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(CurrentUser(resolve_session(parts, &state).await?))
    }
}

/// Extractor for protected routes. A guest is bounced to the login page with
/// the original path carried in `?next=`.
pub struct RequireUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        match resolve_session(parts, &state).await? {
            Some(user) => Ok(RequireUser(user)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(AppError::LoginRequired { next })
            }
        }
    }
}
