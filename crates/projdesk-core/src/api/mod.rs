//! REST API client module for the projdesk backend.
//!
//! This module provides the `ApiClient` for the authentication endpoints
//! under `/auth/` and the project endpoints.
//!
//! Authenticated calls send `Authorization: JWT <access token>`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
