//! Custom TraceLayer span maker that sanitizes sensitive query parameters.
//!
//! The consent callback carries a one-time authorization code and the user id
//! in `state`; neither should end up in request logs.

use axum::http::Request;
use tower_http::trace::MakeSpan;
use tracing::Span;

/// Query parameter names whose values must be redacted in logs.
const SENSITIVE_PARAMS: &[&str] = &[
    "code",
    "state",
    "client_secret",
    "api_key",
    "access_token",
    "refresh_token",
    "token",
];

/// A `MakeSpan` implementation that redacts sensitive query parameters from the
/// logged URI.
#[derive(Clone, Debug)]
pub struct SanitizedMakeSpan;

impl<B> MakeSpan<B> for SanitizedMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let sanitized = sanitize_uri(request.uri());

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %sanitized,
            version = ?request.version(),
        )
    }
}

/// Example: `/oauth/exchange?code=abc&state=u1` becomes
/// `/oauth/exchange?code=[REDACTED]&state=[REDACTED]`
fn sanitize_uri(uri: &axum::http::Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };

    let sanitized_pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive(key) => format!("{key}=[REDACTED]"),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", uri.path(), sanitized_pairs.join("&"))
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_PARAMS.iter().any(|s| key == *s)
}
