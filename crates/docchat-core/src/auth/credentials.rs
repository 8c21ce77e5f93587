use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::store::{KeyValueStore, MemoryStore};
use super::{Session, User};

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// Persists the session token and user record across runs.
///
/// Token and user are written and removed together; `load` only returns a
/// session when both are present and the user record parses.
pub struct CredentialStore {
    backend: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Store token and user. If the user record cannot be written the token
    /// is rolled back so a half session is never left behind.
    pub fn save(&self, session: &Session) -> Result<()> {
        let user = serde_json::to_string(&session.user).context("Failed to serialize user")?;
        self.backend
            .set(TOKEN_KEY, &session.token)
            .context("Failed to store token")?;
        if let Err(e) = self.backend.set(USER_KEY, &user) {
            if let Err(rollback) = self.backend.remove(TOKEN_KEY) {
                warn!(error = %rollback, "Failed to roll back token after user write failed");
            }
            return Err(e).context("Failed to store user");
        }
        debug!(user_id = %session.user.id, "Session saved");
        Ok(())
    }

    /// The persisted session, or `None` when absent or unreadable.
    pub fn load(&self) -> Option<Session> {
        let token = self.read(TOKEN_KEY)?;
        let raw_user = self.read(USER_KEY)?;
        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => Some(Session { token, user }),
            Err(e) => {
                warn!(error = %e, "Stored user record is not parseable, treating as logged out");
                None
            }
        }
    }

    /// Current token only, read fresh on every call.
    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    /// Remove both token and user. Safe to call repeatedly.
    pub fn clear(&self) -> Result<()> {
        let token = self.backend.remove(TOKEN_KEY);
        let user = self.backend.remove(USER_KEY);
        token.context("Failed to remove token")?;
        user.context("Failed to remove user")?;
        debug!("Session cleared");
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential store");
                None
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
