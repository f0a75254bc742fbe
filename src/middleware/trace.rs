//! Request span maker that keeps credentials and emails out of the logs

use axum::http::{Request, Uri};
use tower_http::trace::MakeSpan;
use tracing::Span;

/// Query keys whose values never reach a log line
const REDACTED_KEYS: &[&str] = &["access_token", "token", "password", "email", "user_email"];

#[derive(Clone, Debug, Default)]
pub struct RedactingMakeSpan;

impl<B> MakeSpan<B> for RedactingMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %redact_uri(request.uri()),
        )
    }
}

fn redact_pair(pair: &str) -> String {
    match pair.split_once('=') {
        Some((key, _)) if REDACTED_KEYS.contains(&key.to_ascii_lowercase().as_str()) => {
            format!("{key}=***")
        }
        _ => pair.to_string(),
    }
}

fn redact_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };
    let query = query.split('&').map(redact_pair).collect::<Vec<_>>().join("&");
    format!("{}?{}", uri.path(), query)
}
