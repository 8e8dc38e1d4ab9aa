//! Blocking HTTP plumbing shared by the YouTube and Sheets clients.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("ytscript-tools/", env!("CARGO_PKG_VERSION"));

/// Error reasons that mean the credential itself was refused.
const AUTH_REASONS: &[&str] = &[
    "keyInvalid",
    "keyExpired",
    "accessNotConfigured",
    "API_KEY_INVALID",
];

pub fn build_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}

/// Google APIs wrap failures as `{"error": {...}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
    #[serde(default)]
    details: Vec<ApiErrorItem>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    reason: String,
}

struct ErrorDetail {
    message: String,
    reasons: Vec<String>,
}

fn parse_error_body(body: &str) -> ErrorDetail {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            let mut reasons: Vec<String> = error
                .errors
                .into_iter()
                .chain(error.details)
                .map(|e| e.reason)
                .collect();
            reasons.extend(error.status);
            ErrorDetail {
                message: error.message,
                reasons,
            }
        }
        Err(_) => ErrorDetail {
            message: body.trim().chars().take(200).collect(),
            reasons: Vec::new(),
        },
    }
}

/// Maps a non-success HTTP status and its body onto the error taxonomy.
pub fn classify_status(service: &str, status: u16, body: &str) -> Error {
    let detail = parse_error_body(body);
    let message = if detail.message.is_empty() {
        format!("{service} returned HTTP {status}")
    } else {
        format!("{service} returned HTTP {status}: {}", detail.message)
    };
    let auth_reason = detail
        .reasons
        .iter()
        .any(|reason| AUTH_REASONS.contains(&reason.as_str()));

    match status {
        401 | 403 => Error::Authentication(message),
        404 => Error::NotFound(message),
        400 if auth_reason => Error::Authentication(message),
        400 if detail.message.starts_with("Unable to parse range") => Error::NotFound(message),
        _ => Error::Upstream(message),
    }
}

/// Converts a `ureq` failure, reading the error body when there is one.
pub fn from_ureq(service: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            classify_status(service, status, &body)
        }
        ureq::Error::Transport(transport) => {
            Error::upstream(format!("{service} request failed: {transport}"))
        }
    }
}

pub fn read_json<T: DeserializeOwned>(service: &str, response: ureq::Response) -> Result<T> {
    response
        .into_json::<T>()
        .map_err(|err| Error::upstream(format!("{service} returned an unexpected body: {err}")))
}
