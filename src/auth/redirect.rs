use tracing::debug;
use url::Url;

/// Sanitize a caller-supplied post-login target.
///
/// Only two shapes of `candidate` survive: a site-relative path (single
/// leading slash, no backslashes or control characters) and an absolute URL
/// whose scheme, host and port all match `site_origin`. Everything else,
/// including protocol-relative `//host/...` forms, falls back to `fallback`
/// so a crafted login link cannot bounce the user off-site.
pub fn sanitize_next(candidate: Option<&str>, site_origin: &Url, fallback: &str) -> String {
    let raw = match candidate.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return fallback.to_string(),
    };

    // Browsers strip ASCII tab and newlines before parsing a URL, so a
    // control character can turn "/\t/host" into scheme-relative "//host".
    if raw.chars().any(|c| c.is_ascii_control()) {
        debug!(next = ?raw, "rejected redirect target with control characters");
        return fallback.to_string();
    }

    if raw.starts_with('/') {
        // Browsers treat "//host" and "/\host" as scheme-relative.
        if raw.starts_with("//") || raw.contains('\\') {
            debug!(next = raw, "rejected scheme-relative redirect target");
            return fallback.to_string();
        }
        return raw.to_string();
    }

    match Url::parse(raw) {
        Ok(parsed) if same_origin(&parsed, site_origin) => raw.to_string(),
        Ok(_) => {
            debug!(next = raw, "rejected foreign redirect target");
            fallback.to_string()
        }
        Err(_) => fallback.to_string(),
    }
}

fn same_origin(candidate: &Url, site: &Url) -> bool {
    candidate.scheme() == site.scheme()
        && candidate.host_str() == site.host_str()
        && candidate.port_or_known_default() == site.port_or_known_default()
}
