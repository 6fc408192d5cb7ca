//! Mapping of CouchDB responses onto `StorageError`.

use procreg_storage::StorageError;
use serde::Deserialize;

/// Error body returned by CouchDB: `{"error": "conflict", "reason": "..."}`.
#[derive(Debug, Deserialize)]
struct CouchErrorBody {
    error: String,
    #[serde(default)]
    reason: Option<String>,
}

fn describe(body: &str) -> String {
    match serde_json::from_str::<CouchErrorBody>(body) {
        Ok(parsed) => match parsed.reason {
            Some(reason) if !reason.is_empty() => reason,
            _ => parsed.error,
        },
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Converts a non-success status into the matching error kind.
///
/// `subject` names the document, index or database the request addressed.
pub(crate) fn error_for_status(operation: &str, subject: &str, status: u16, body: &str) -> StorageError {
    let message = describe(body);
    match status {
        404 => StorageError::not_found(subject),
        409 | 412 => StorageError::conflict(subject, message),
        401 | 403 => StorageError::permission(message),
        400 => StorageError::validation(message),
        _ => StorageError::backend(operation, Some(status), message),
    }
}

/// Converts a transport-level failure.
pub(crate) fn transport_error(operation: &str, err: reqwest::Error) -> StorageError {
    if err.is_decode() {
        StorageError::serialization(format!("{operation}: {err}"))
    } else if err.is_timeout() {
        StorageError::connection(format!("{operation} timed out"))
    } else {
        StorageError::connection(format!("{operation}: {err}"))
    }
}

/// Masks the password in a URL for logging.
pub fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@')
        && let Some(colon_pos) = url[..at_pos].rfind(':')
    {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if colon_pos > scheme_end {
            return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}
