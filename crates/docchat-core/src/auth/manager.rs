//! Login lifecycle and the current-user state the rest of the app reads.

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, Credentials, RegisterResponse, Registration};
use crate::events::AuthEvent;

use super::{Session, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// A stored session exists but has not been confirmed by the backend.
    Validating,
    Authenticated(User),
}

pub struct AuthManager {
    client: ApiClient,
    state: AuthState,
    last_error: Option<String>,
    validated: bool,
}

impl AuthManager {
    pub fn new(client: ApiClient) -> Self {
        let state = if client.credentials().load().is_some() {
            AuthState::Validating
        } else {
            AuthState::Unauthenticated
        };
        debug!(?state, "Auth manager created");
        Self {
            client,
            state,
            last_error: None,
            validated: false,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    /// User-facing message from the last failed register or login.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Create an account. Does not log in.
    pub async fn register(&mut self, registration: &Registration) -> Result<RegisterResponse, ApiError> {
        self.last_error = None;
        match self.client.register(registration).await {
            Ok(response) => {
                info!(email = %registration.email, "Registered");
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.last_error = Some(e.user_message("Failed to register"));
                Err(e)
            }
        }
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<User, ApiError> {
        self.last_error = None;
        let response = match self.client.login(credentials).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.last_error = Some(e.user_message("Failed to login"));
                self.state = AuthState::Unauthenticated;
                return Err(e);
            }
        };

        let session = Session::new(response.token, response.user);
        // Requests read the token from the store, so an unsaved session is no session.
        if let Err(e) = self.client.credentials().save(&session) {
            warn!(error = %e, "Failed to persist session");
            let err = ApiError::Storage(format!("{:#}", e));
            self.last_error = Some(err.user_message("Failed to login"));
            self.state = AuthState::Unauthenticated;
            return Err(err);
        }

        info!(user_id = %session.user.id, "Logged in");
        self.state = AuthState::Authenticated(session.user.clone());
        self.validated = true;
        self.client.publish(AuthEvent::LoggedIn(session.user.clone()));
        Ok(session.user)
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.client.credentials().clear() {
            warn!(error = %e, "Failed to clear credentials on logout");
        }
        self.state = AuthState::Unauthenticated;
        self.client.publish(AuthEvent::LoggedOut);
        info!("Logged out");
    }

    /// Confirm a persisted session with the backend. Runs once; later calls
    /// return the current state without a request.
    pub async fn validate_on_startup(&mut self) -> &AuthState {
        if self.validated {
            return &self.state;
        }
        self.validated = true;

        let Some(session) = self.client.credentials().load() else {
            self.state = AuthState::Unauthenticated;
            return &self.state;
        };

        self.state = AuthState::Validating;
        match self.client.current_user().await {
            Ok(_) => {
                debug!(user_id = %session.user.id, "Stored session is valid");
                self.state = AuthState::Authenticated(session.user);
            }
            Err(e) => {
                warn!(error = %e, "Token validation failed");
                if let Err(e) = self.client.credentials().clear() {
                    warn!(error = %e, "Failed to clear credentials after validation failure");
                }
                self.state = AuthState::Unauthenticated;
            }
        }
        &self.state
    }

    /// Keep state in line with events published by the request layer.
    ///
    /// Returns false when the event was ignored: an expired-session event
    /// raised for a token that a later login has already replaced.
    pub fn handle_event(&mut self, event: &AuthEvent) -> bool {
        if event.is_stale(self.client.credentials().token().as_deref()) {
            debug!("Ignoring expired-session event for a replaced token");
            return false;
        }
        if matches!(event, AuthEvent::SessionExpired { .. }) && self.state != AuthState::Unauthenticated {
            debug!("Session expired, dropping to unauthenticated");
            self.state = AuthState::Unauthenticated;
        }
        true
    }
}
