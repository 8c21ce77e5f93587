//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `KeyValueStore` backends: memory, JSON file, and OS keyring
//! - `CredentialStore`: token + user persistence on top of a backend
//! - `AuthManager`: the login/register/logout/startup-validation lifecycle

pub mod credentials;
pub mod manager;
pub mod session;
pub mod store;

pub use credentials::CredentialStore;
pub use manager::{AuthManager, AuthState};
pub use session::{Session, User};
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
