//! Auth events and the navigation state that reacts to them.
//!
//! The request layer never navigates on its own. When it sees an expired
//! session it publishes `AuthEvent::SessionExpired`; the application shell
//! feeds events into its `Navigator`, which decides whether to move to the
//! login screen.

use tracing::debug;

use crate::auth::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn(User),
    LoggedOut,
    /// A request came back 401 and the stored session was discarded.
    /// `token` is what that request was sent with.
    SessionExpired { token: Option<String> },
}

impl AuthEvent {
    pub fn session_expired(token: Option<String>) -> Self {
        AuthEvent::SessionExpired { token }
    }

    /// True for a `SessionExpired` raised by a request whose token has
    /// since been replaced by a newer login.
    pub fn is_stale(&self, current_token: Option<&str>) -> bool {
        match self {
            AuthEvent::SessionExpired { token } => {
                current_token.is_some() && current_token != token.as_deref()
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Chat,
    Documents,
    Scraper,
    ApiSettings,
}

impl Route {
    /// Screens that need an authenticated session.
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Chat | Route::Documents | Route::Scraper | Route::ApiSettings
        )
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Chat => "/chat",
            Route::Documents => "/documents",
            Route::Scraper => "/scraper",
            Route::ApiSettings => "/api-settings",
        }
    }
}

/// Tracks the currently displayed screen.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: Route,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    pub fn navigate(&mut self, route: Route) {
        if self.current != route {
            debug!(from = self.current.path(), to = route.path(), "Navigating");
            self.current = route;
        }
    }

    /// Apply an auth event. Returns true if the current screen changed.
    pub fn handle_event(&mut self, event: &AuthEvent) -> bool {
        let target = match event {
            AuthEvent::SessionExpired { .. } | AuthEvent::LoggedOut => Route::Login,
            AuthEvent::LoggedIn(_) if matches!(self.current, Route::Login | Route::Register) => {
                Route::Home
            }
            AuthEvent::LoggedIn(_) => return false,
        };
        if self.current == target {
            return false;
        }
        self.navigate(target);
        true
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}
