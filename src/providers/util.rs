use crate::core::source::FetchError;
use reqwest::StatusCode;

pub const USER_AGENT: &str = concat!("fundtrack/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client used by providers.
pub fn http_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FetchError::Permanent(format!("Failed to build HTTP client: {e}")))
}

/// Maps a non-success HTTP status onto the fetch error taxonomy.
///
/// Returns `None` for success statuses.
pub fn classify_status(status: StatusCode, symbol: &str) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    let error = match status {
        StatusCode::NOT_FOUND => FetchError::NotFound(symbol.to_string()),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            FetchError::Transient(format!("HTTP error: {status} for symbol: {symbol}"))
        }
        s if s.is_server_error() => {
            FetchError::Transient(format!("HTTP error: {status} for symbol: {symbol}"))
        }
        _ => FetchError::Permanent(format!("HTTP error: {status} for symbol: {symbol}")),
    };
    Some(error)
}

/// Maps a transport-level `reqwest` failure onto the fetch error taxonomy.
pub fn classify_request_error(error: &reqwest::Error, symbol: &str) -> FetchError {
    if error.is_builder() {
        return FetchError::Permanent(format!("Invalid request for symbol {symbol}: {error}"));
    }
    if let Some(status) = error.status()
        && let Some(classified) = classify_status(status, symbol)
    {
        return classified;
    }
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        return FetchError::Transient(format!("Request error: {error} for symbol: {symbol}"));
    }
    FetchError::Permanent(format!("Request error: {error} for symbol: {symbol}"))
}
