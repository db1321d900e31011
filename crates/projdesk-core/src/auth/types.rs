//! Authentication types shared by the transport, token stores and session.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field key the server uses for messages not tied to an input field
pub const DETAIL_KEY: &str = "detail";

/// An access/refresh token pair as issued by `/auth/token/`.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Tokens are credentials; only their lengths show up in logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_len", &self.access.len())
            .field("refresh_len", &self.refresh.len())
            .finish()
    }
}

/// Expiry horizons for persisted tokens.
///
/// Only expiry-bearing stores use these, and the access horizon is advisory:
/// the verify endpoint decides whether a token is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl TokenTtl {
    pub fn days(access: i64, refresh: i64) -> Self {
        Self {
            access: Duration::days(access),
            refresh: Duration::days(refresh),
        }
    }
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self::days(1, 7)
    }
}

/// A failed login or registration, shaped for per-field rendering.
///
/// `field_errors` holds the server's validation messages keyed by input
/// name (`username`, `email`, `password`, ...). `detail` holds a message with
/// no field association, including the generic transport failure message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFailure {
    #[serde(default)]
    pub field_errors: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuthFailure {
    pub fn detail(message: impl Into<String>) -> Self {
        Self {
            field_errors: BTreeMap::new(),
            detail: Some(message.into()),
        }
    }

    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(name.into(), vec![message.into()]);
        Self {
            field_errors,
            detail: None,
        }
    }

    /// Decode a server error body.
    ///
    /// Anything that is not a JSON object decodes to an empty failure, which
    /// callers fill with their fallback message.
    pub fn from_error_body(body: &Value) -> Self {
        let mut failure = Self::default();
        let Some(object) = body.as_object() else {
            return failure;
        };

        for (key, value) in object {
            if key == DETAIL_KEY {
                failure.detail = match value {
                    Value::Null => None,
                    Value::Array(items) => {
                        Some(message_list(items).join(" ")).filter(|d| !d.is_empty())
                    }
                    other => Some(message_text(other)),
                };
                continue;
            }

            let messages = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => message_list(items),
                _ => continue,
            };
            failure.field_errors.insert(key.clone(), messages);
        }

        failure
    }

    pub fn is_empty(&self) -> bool {
        self.detail.is_none() && self.field_errors.values().all(|m| m.is_empty())
    }

    /// First message for a field, the one a form shows under its input.
    pub fn first_error(&self, field: &str) -> Option<&str> {
        self.field_errors
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn message_list(items: &[Value]) -> Vec<String> {
    items.iter().map(message_text).collect()
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .field_errors
            .iter()
            .filter_map(|(field, messages)| {
                messages.first().map(|m| format!("{}: {}", field, m))
            })
            .collect();
        if let Some(ref detail) = self.detail {
            parts.push(detail.clone());
        }
        if parts.is_empty() {
            write!(f, "Unknown authentication error")
        } else {
            write!(f, "{}", parts.join("; "))
        }
    }
}

impl std::error::Error for AuthFailure {}

/// The user representation returned by `/auth/users/` on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
}

/// Registration form input, including the confirmation that never leaves
/// the client.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// In-memory authentication state.
///
/// Holding the tokens as one `Option<TokenPair>` keeps access and refresh
/// tokens present or absent together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    tokens: Option<TokenPair>,
}

impl Session {
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    pub fn authenticated(tokens: TokenPair) -> Self {
        Self {
            tokens: Some(tokens),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.refresh.as_str())
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_field_lists() {
        let body = json!({
            "username": ["already taken", "too short"],
            "password": "This field may not be blank."
        });
        let failure = AuthFailure::from_error_body(&body);

        assert_eq!(failure.first_error("username"), Some("already taken"));
        assert_eq!(failure.field_errors["username"].len(), 2);
        assert_eq!(
            failure.first_error("password"),
            Some("This field may not be blank.")
        );
        assert!(failure.detail.is_none());
    }

    #[test]
    fn test_error_body_detail_only() {
        let body = json!({"detail": "No active account found with the given credentials"});
        let failure = AuthFailure::from_error_body(&body);

        assert!(failure.field_errors.is_empty());
        assert_eq!(
            failure.detail.as_deref(),
            Some("No active account found with the given credentials")
        );
    }

    #[test]
    fn test_error_body_not_an_object() {
        assert!(AuthFailure::from_error_body(&json!(["oops"])).is_empty());
        assert!(AuthFailure::from_error_body(&json!("oops")).is_empty());
        assert!(AuthFailure::from_error_body(&Value::Null).is_empty());
    }

    #[test]
    fn test_error_body_detail_list_is_joined() {
        let body = json!({"detail": ["Bad creds", "Try again later."]});
        let failure = AuthFailure::from_error_body(&body);
        assert_eq!(failure.detail.as_deref(), Some("Bad creds Try again later."));

        let failure = AuthFailure::from_error_body(&json!({"detail": []}));
        assert!(failure.is_empty());
    }

    #[test]
    fn test_error_body_skips_nested_objects() {
        let body = json!({"meta": {"a": 1}, "email": [1]});
        let failure = AuthFailure::from_error_body(&body);
        assert!(!failure.field_errors.contains_key("meta"));
        assert_eq!(failure.first_error("email"), Some("1"));
    }

    #[test]
    fn test_is_empty() {
        assert!(AuthFailure::default().is_empty());
        assert!(!AuthFailure::detail("x").is_empty());
        assert!(!AuthFailure::field("email", "bad").is_empty());
    }

    #[test]
    fn test_display_joins_first_messages() {
        let mut failure = AuthFailure::field("email", "Enter a valid email address.");
        failure.detail = Some("Registration error".to_string());
        assert_eq!(
            failure.to_string(),
            "email: Enter a valid email address.; Registration error"
        );
        assert_eq!(AuthFailure::default().to_string(), "Unknown authentication error");
    }

    #[test]
    fn test_token_pair_debug_hides_values() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let debug = format!("{:?}", pair);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("access_len: 13"));
    }

    #[test]
    fn test_session_tokens_travel_together() {
        let session = Session::unauthenticated();
        assert!(!session.is_authenticated());
        assert!(session.access_token().is_none());
        assert!(session.refresh_token().is_none());

        let session = Session::authenticated(TokenPair::new("a", "r"));
        assert!(session.is_authenticated());
        assert_eq!(session.access_token(), Some("a"));
        assert_eq!(session.refresh_token(), Some("r"));
    }
}
