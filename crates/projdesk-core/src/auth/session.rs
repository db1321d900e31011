use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::store::TokenStore;
use super::types::{AuthFailure, RegisteredUser, Registration, Session, TokenPair, TokenTtl};
use crate::api::{client::LOGIN_REQUEST_ERROR, ApiClient};

/// Message reported under the `password` field when confirmation differs
pub const PASSWORD_MISMATCH: &str = "Passwords do not match";

/// Marks one kind of operation as running; cleared on drop.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Single writer of the authentication state.
///
/// Consumers read the session through [`SessionManager::session`] or
/// [`SessionManager::subscribe`]; only the manager's operations change it.
pub struct SessionManager {
    api: ApiClient,
    store: Box<dyn TokenStore>,
    ttl: TokenTtl,
    state: watch::Sender<Session>,
    initializing: AtomicBool,
    logging_in: AtomicBool,
    registering: AtomicBool,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Box<dyn TokenStore>, ttl: TokenTtl) -> Self {
        let (state, _) = watch::channel(Session::unauthenticated());
        Self {
            api,
            store,
            ttl,
            state,
            initializing: AtomicBool::new(false),
            logging_in: AtomicBool::new(false),
            registering: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token().map(str::to_string)
    }

    fn publish(&self, session: Session) {
        self.state.send_if_modified(|current| {
            if *current == session {
                false
            } else {
                *current = session;
                true
            }
        });
    }

    /// Restore a session from stored tokens at startup.
    ///
    /// Returns whether the session ended up authenticated.
    pub async fn initialize(&self) -> bool {
        let Some(_guard) = InFlight::acquire(&self.initializing) else {
            warn!("Session initialization already in progress");
            return false;
        };

        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to load stored tokens");
                None
            }
        };

        let Some(pair) = stored else {
            info!("No stored tokens, starting unauthenticated");
            return false;
        };

        match self.check_validity(pair).await {
            Some(pair) => {
                self.publish(Session::authenticated(pair));
                info!("Session restored from stored tokens");
                true
            }
            None => false,
        }
    }

    /// Verify the access token, falling back to one refresh attempt.
    ///
    /// Runs once per startup. A refreshed access token is trusted without
    /// re-verification. When both tokens are rejected the session is logged
    /// out.
    async fn check_validity(&self, pair: TokenPair) -> Option<TokenPair> {
        if self.api.verify_token(&pair.access).await {
            debug!("Stored access token is valid");
            return Some(pair);
        }

        match self.api.refresh_token(&pair.refresh).await {
            Some(access) => {
                if let Err(e) = self.store.update_access(&access, self.ttl) {
                    warn!(error = %e, "Failed to persist refreshed access token");
                }
                info!("Access token refreshed");
                Some(TokenPair {
                    access,
                    refresh: pair.refresh,
                })
            }
            None => {
                info!("Stored tokens are no longer valid, logging out");
                self.logout();
                None
            }
        }
    }

    /// Log in and persist the issued token pair.
    ///
    /// Server rejections are returned unchanged and leave the session as it
    /// was.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthFailure> {
        let Some(_guard) = InFlight::acquire(&self.logging_in) else {
            warn!("Login already in progress");
            return Err(AuthFailure::detail(
                "Another login request is already in progress",
            ));
        };

        let pair = self.api.login(username, password).await?;

        if let Err(e) = self.store.save(&pair, self.ttl) {
            error!(error = %e, "Failed to persist tokens after login");
            return Err(AuthFailure::detail(LOGIN_REQUEST_ERROR));
        }

        self.publish(Session::authenticated(pair));
        Ok(())
    }

    /// Create an account. Registration does not log the user in.
    pub async fn register(&self, registration: &Registration) -> Result<RegisteredUser, AuthFailure> {
        if registration.password != registration.confirm_password {
            return Err(AuthFailure::field("password", PASSWORD_MISMATCH));
        }

        let Some(_guard) = InFlight::acquire(&self.registering) else {
            warn!("Registration already in progress");
            return Err(AuthFailure::detail(
                "Another registration request is already in progress",
            ));
        };

        self.api
            .register(
                &registration.username,
                &registration.email,
                &registration.password,
            )
            .await
    }

    /// Forget the stored tokens and the in-memory session. Safe to repeat.
    pub fn logout(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
        self.publish(Session::unauthenticated());
        info!("Logged out");
    }
}
