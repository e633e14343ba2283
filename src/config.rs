use anyhow::Context;
use url::Url;

/// Well-known development fallback. Refused when APP_ENV=production.
const DEV_SECRET: &str = "dev-secret-key-change-in-production";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
    pub remember_ttl_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Origin this instance is served from; absolute "next" redirect targets
    /// must match it exactly.
    pub site_origin: Url,
    /// Where a fresh login lands when no usable "next" target was supplied.
    pub default_redirect: String,
    /// Seed the well-known admin account at startup. Off unless explicitly
    /// requested; the seeded credentials are a development convenience, not
    /// something to expose.
    pub bootstrap_admin: bool,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = match std::env::var("SESSION_SECRET") {
            Ok(s) => s,
            Err(_) => {
                if std::env::var("APP_ENV").as_deref() == Ok("production") {
                    anyhow::bail!("SESSION_SECRET must be set when APP_ENV=production");
                }
                DEV_SECRET.to_string()
            }
        };

        let session = SessionConfig {
            secret,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "hallpass".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            remember_ttl_minutes: std::env::var("REMEMBER_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false),
        };

        let site_origin =
            std::env::var("SITE_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".into());
        let site_origin = Url::parse(&site_origin).context("SITE_ORIGIN is not a valid URL")?;

        Ok(Self {
            database_url,
            site_origin,
            default_redirect: std::env::var("DEFAULT_REDIRECT").unwrap_or_else(|_| "/".into()),
            bootstrap_admin: std::env::var("BOOTSTRAP_ADMIN")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false),
            session,
        })
    }
}
