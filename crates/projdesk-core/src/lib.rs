//! projdesk core - API client, token storage and session management for
//! the projdesk project tracker.
//!
//! A frontend builds a [`SessionManager`] from the [`Config`], calls
//! [`SessionManager::initialize`] once at startup, and then drives login,
//! registration and logout from user actions.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod project;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthFailure, Registration, Session, SessionManager, TokenPair, TokenStore};
pub use config::Config;
pub use project::{ProjectDraft, ProjectValidationError};

/// Build a session manager wired to the configured API and token store.
pub fn session_manager(config: &Config) -> anyhow::Result<SessionManager> {
    let api = ApiClient::new(config.api_base_url())?;
    let store = auth::open_token_store(config)?;
    Ok(SessionManager::new(api, store, config.token_ttl()))
}
