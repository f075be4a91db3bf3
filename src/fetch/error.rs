use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Fallback text for failures with no better message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something bad happened; please try again later.";

/// Persisted session entries a host clears on `Unauthorized`.
pub const SESSION_KEYS: [&str; 4] = ["token", "refresh_token", "session_id", "remember"];

/// A failed option request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with status {status}")]
    Status { status: u16, body: Value },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// User-facing category of a failed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum NormalizedError {
    /// 401. The host should drop the persisted session (`SESSION_KEYS`).
    Unauthorized { message: Option<String> },

    /// 400 and 409: the server's own message.
    Rejected { message: Option<String> },

    /// 402.
    PaymentRequired { status: u16, message: Option<String> },

    /// 422: the whole error body.
    Unprocessable { detail: Value },

    /// 425: the server's error list.
    TooEarly { errors: Value },

    /// 500: the wrapped upstream message.
    ServerError { message: Option<String> },

    Generic,
}

impl NormalizedError {
    pub fn clears_session(&self) -> bool {
        matches!(self, NormalizedError::Unauthorized { .. })
    }

    pub fn user_message(&self) -> String {
        let message = match self {
            NormalizedError::Unauthorized { message }
            | NormalizedError::Rejected { message }
            | NormalizedError::PaymentRequired { message, .. }
            | NormalizedError::ServerError { message } => message.clone(),
            NormalizedError::Unprocessable { detail } => text_at(detail, &["message"]),
            NormalizedError::TooEarly { errors } => match errors {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            },
            NormalizedError::Generic => None,
        };
        message.unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
    }
}

/// Map a fetch failure to the category the user should see.
pub fn normalize_fetch_error(error: &FetchError) -> NormalizedError {
    let FetchError::Status { status, body } = error else {
        return NormalizedError::Generic;
    };

    match *status {
        401 => NormalizedError::Unauthorized {
            message: text_at(body, &["message"]),
        },
        400 | 409 => NormalizedError::Rejected {
            message: text_at(body, &["message"]),
        },
        402 => NormalizedError::PaymentRequired {
            status: *status,
            message: text_at(body, &["data", "mensaje"]),
        },
        422 => NormalizedError::Unprocessable {
            detail: body.clone(),
        },
        425 => NormalizedError::TooEarly {
            errors: body
                .pointer("/message/errors")
                .cloned()
                .unwrap_or(Value::Null),
        },
        500 => NormalizedError::ServerError {
            message: text_at(body, &["previous", "message"]),
        },
        _ => NormalizedError::Generic,
    }
}

fn text_at(body: &Value, path: &[&str]) -> Option<String> {
    let mut current = body;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
