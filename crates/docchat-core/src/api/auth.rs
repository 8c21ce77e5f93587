use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::auth::User;

use super::{require, ApiClient, ApiError, RequestContext};

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";
const CURRENT_USER_PATH: &str = "/api/auth/user";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        require(&self.email, "Email is required")?;
        require(&self.password, "Password is required")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl Registration {
    fn validate(&self) -> Result<(), ApiError> {
        require(&self.email, "Email is required")?;
        require(&self.password, "Password is required")
    }
}

/// The backend also issues a token on registration; it is deliberately
/// not used to start a session.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

impl ApiClient {
    pub async fn register(&self, registration: &Registration) -> Result<RegisterResponse, ApiError> {
        registration.validate()?;
        let request = self.request(Method::POST, REGISTER_PATH).json(registration);
        let ctx = RequestContext::credentials_exchange(self.credentials().token());
        self.send_json(request, ctx, REGISTER_PATH).await
    }

    /// Exchange credentials for a token. Does not touch the credential store.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        credentials.validate()?;
        let request = self.request(Method::POST, LOGIN_PATH).json(credentials);
        let ctx = RequestContext::credentials_exchange(self.credentials().token());
        self.send_json(request, ctx, LOGIN_PATH).await
    }

    /// Ask the backend who the stored token belongs to.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get(CURRENT_USER_PATH).await
    }
}
