//! Core library for docchat.
//!
//! This crate provides:
//! - `api`: the `ApiClient` request pipeline and feature callers
//! - `auth`: credential persistence and the login/session lifecycle
//! - `events`: auth events and the navigation state that reacts to them
//! - `models`: request/response payloads and provider detection
//! - `config`: user configuration and storage backend selection

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod models;

pub use api::{ApiClient, ApiError, RequestContext};
pub use auth::{AuthManager, AuthState, CredentialStore, Session, User};
pub use config::Config;
pub use events::{AuthEvent, Navigator, Route};
