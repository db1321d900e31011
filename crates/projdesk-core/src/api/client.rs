//! API client for communicating with the projdesk REST API.
//!
//! This module provides the `ApiClient` struct, which performs the four
//! authentication calls (login, register, verify, refresh) and the
//! authenticated project calls.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthFailure, RegisteredUser, TokenPair};
use crate::models::{NewProject, Project, StatusPriority};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/auth/token/";
const REGISTER_PATH: &str = "/auth/users/";
const VERIFY_PATH: &str = "/auth/token/verify/";
const REFRESH_PATH: &str = "/auth/token/refresh/";
const STATUS_PRIORITY_PATH: &str = "/status_priority/";
const CREATE_PROJECT_PATH: &str = "/create_project/";

/// Authorization scheme expected by the server (`Authorization: JWT <token>`)
const AUTH_SCHEME: &str = "JWT";

pub const LOGIN_REQUEST_ERROR: &str = "Error making login request";
pub const REGISTER_REQUEST_ERROR: &str = "Error making registration request";
const LOGIN_FALLBACK_ERROR: &str = "Authentication error";
const REGISTER_FALLBACK_ERROR: &str = "Registration error";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Canonical token shape. `accessToken`/`refreshToken` bodies do not match
/// and are rejected.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// API client for the projdesk backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Authentication =====

    /// Exchange credentials for a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthFailure> {
        let request = LoginRequest { username, password };
        let outcome = self
            .post_auth::<_, TokenResponse>(LOGIN_PATH, &request, LOGIN_FALLBACK_ERROR)
            .await
            .and_then(|outcome| match outcome {
                Ok(response) => Self::token_pair(response).map(Ok),
                Err(failure) => Ok(Err(failure)),
            });

        match outcome {
            Ok(Ok(pair)) => {
                info!(username, "Login succeeded");
                Ok(pair)
            }
            Ok(Err(failure)) => {
                warn!(username, "Login rejected by server");
                Err(failure)
            }
            Err(e) => {
                error!(error = %e, "Error making login request");
                Err(AuthFailure::detail(LOGIN_REQUEST_ERROR))
            }
        }
    }

    /// Create a user account. Does not log the user in.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, AuthFailure> {
        let request = RegisterRequest {
            username,
            email,
            password,
        };
        let outcome = self
            .post_auth::<_, RegisteredUser>(REGISTER_PATH, &request, REGISTER_FALLBACK_ERROR)
            .await;

        match outcome {
            Ok(Ok(user)) => {
                info!(username = %user.username, "User registered");
                Ok(user)
            }
            Ok(Err(failure)) => {
                warn!(username, "Registration rejected by server");
                Err(failure)
            }
            Err(e) => {
                error!(error = %e, "Error making registration request");
                Err(AuthFailure::detail(REGISTER_REQUEST_ERROR))
            }
        }
    }

    /// Ask the server whether an access token is still valid.
    ///
    /// Only HTTP 200 counts as valid. Every other outcome, including
    /// network failures, is reported as invalid.
    pub async fn verify_token(&self, access: &str) -> bool {
        if access.is_empty() {
            warn!("Access token is missing, not verifying");
            return false;
        }

        let result = self
            .client
            .post(self.url(VERIFY_PATH))
            .json(&VerifyRequest { token: access })
            .send()
            .await;

        match result {
            Ok(response) => match response.status() {
                StatusCode::OK => {
                    info!("Token successfully verified");
                    true
                }
                StatusCode::UNAUTHORIZED => {
                    warn!("Access token is invalid or expired");
                    false
                }
                status => {
                    error!(%status, "Unknown error verifying token");
                    false
                }
            },
            Err(e) => {
                error!(error = %e, "Error verifying token");
                false
            }
        }
    }

    /// Trade a refresh token for a new access token.
    ///
    /// Returns `None` on 401, any other non-200 status, network failure or
    /// a 200 body without a usable `access` field.
    pub async fn refresh_token(&self, refresh: &str) -> Option<String> {
        if refresh.is_empty() {
            warn!("Refresh token is missing, not refreshing");
            return None;
        }

        let result = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh })
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Error refreshing token");
                return None;
            }
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => {
                warn!("Refresh token is invalid or expired");
                return None;
            }
            status => {
                error!(%status, "Unknown error refreshing token");
                return None;
            }
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Error reading refresh response");
                return None;
            }
        };

        match serde_json::from_str::<RefreshResponse>(&body) {
            Ok(parsed) if !parsed.access.is_empty() => {
                if parsed.refresh.is_some() {
                    debug!("Refresh response carried a refresh token, keeping the stored one");
                }
                info!("Token successfully refreshed");
                Some(parsed.access)
            }
            Ok(_) => {
                error!("Refresh response contained an empty access token");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to parse refresh response");
                None
            }
        }
    }

    /// POST a JSON body to an auth endpoint.
    ///
    /// The outer `Result` carries transport failures (network, timeout,
    /// malformed bodies). The inner one carries a decoded server rejection.
    async fn post_auth<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<Result<T, AuthFailure>, ApiError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let parsed = serde_json::from_str(&text).map_err(|e| {
                ApiError::InvalidResponse(format!("Unexpected response shape from {}: {}", path, e))
            })?;
            return Ok(Ok(parsed));
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|_| ApiError::from_response(path, status, &text))?;
        let mut failure = AuthFailure::from_error_body(&value);
        if failure.is_empty() {
            failure.detail = Some(fallback.to_string());
        }

        debug!(
            %status,
            fields = ?failure.field_errors.keys().collect::<Vec<_>>(),
            has_detail = failure.detail.is_some(),
            "Server returned structured error"
        );
        Ok(Err(failure))
    }

    fn token_pair(response: TokenResponse) -> Result<TokenPair, ApiError> {
        if response.access.is_empty() || response.refresh.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Token response contained an empty token".to_string(),
            ));
        }
        Ok(TokenPair {
            access: response.access,
            refresh: response.refresh,
        })
    }

    // ===== Projects =====

    /// Fetch the project statuses and priority labels offered by the server
    pub async fn fetch_status_priority(&self, access: &str) -> Result<StatusPriority, ApiError> {
        self.get(STATUS_PRIORITY_PATH, access).await
    }

    /// Create a project
    pub async fn create_project(
        &self,
        access: &str,
        project: &NewProject,
    ) -> Result<Project, ApiError> {
        let created: Project = self.post(CREATE_PROJECT_PATH, access, project).await?;
        info!(id = ?created.id, name = %project.name, "Project created");
        Ok(created)
    }

    fn auth_headers(access: &str) -> Result<header::HeaderMap, ApiError> {
        if access.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        let mut value = header::HeaderValue::from_str(&format!("{} {}", AUTH_SCHEME, access))
            .map_err(|_| ApiError::InvalidToken)?;
        value.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value);
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(
        response: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_response(path, status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, access: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .headers(Self::auth_headers(access)?)
            .send()
            .await?;

        let response = Self::check_response(response, path).await?;
        Self::parse_json(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        access: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .headers(Self::auth_headers(access)?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response, path).await?;
        Self::parse_json(response, path).await
    }
}
