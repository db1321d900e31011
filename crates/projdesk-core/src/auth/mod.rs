//! Authentication module for managing user sessions and tokens.
//!
//! This module provides:
//! - `SessionManager`: login, registration, logout and startup restoration
//! - `TokenStore`: persistence of the access/refresh pair (keyring, file, memory)
//! - `Session`, `TokenPair`, `AuthFailure`: the shared auth types
//!
//! At startup stored tokens are verified once; an invalid access token gets a
//! single refresh attempt before the session is dropped.

pub mod session;
pub mod store;
pub mod types;

pub use session::{SessionManager, PASSWORD_MISMATCH};
pub use store::{
    open_token_store, FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore,
    ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
pub use types::{AuthFailure, RegisteredUser, Registration, Session, TokenPair, TokenTtl};
