use reqwest::StatusCode;
use thiserror::Error;

/// Failure of an authenticated project call.
///
/// Login and registration report their failures as
/// [`AuthFailure`](crate::auth::AuthFailure) instead.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in or the session has expired")]
    Unauthorized,

    #[error("Access token cannot be sent in a request header")]
    InvalidToken,

    #[error("Not allowed to {path}")]
    Forbidden { path: String },

    /// 4xx other than 401/403, usually a validation message from the server.
    #[error("Request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Longest response excerpt kept in an error
const MAX_BODY_EXCERPT: usize = 300;

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_BODY_EXCERPT {
        return body.to_string();
    }
    let mut end = MAX_BODY_EXCERPT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}

impl ApiError {
    /// Classify a non-success response from `path`.
    pub fn from_response(path: &str, status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden {
                path: path.to_string(),
            },
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                body: excerpt(body),
            },
            s => ApiError::Rejected {
                status: s.as_u16(),
                body: excerpt(body),
            },
        }
    }

    /// Whether logging in again could make the call succeed.
    pub fn needs_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::InvalidToken)
    }
}
