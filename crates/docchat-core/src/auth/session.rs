use serde::{Deserialize, Serialize};

/// The authenticated user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// The backend reports this as `name`.
    #[serde(alias = "name", default)]
    pub username: String,
}

impl User {
    /// Name to greet the user with; falls back to the email address.
    pub fn display_name(&self) -> &str {
        if self.username.trim().is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

/// A bearer token paired with the user it authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accepts_backend_name_field() {
        let user: User =
            serde_json::from_str(r#"{"id": "42", "email": "a@b.c", "name": "alice"}"#).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.display_name(), "alice");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user: User = serde_json::from_str(r#"{"id": "42", "email": "a@b.c"}"#).unwrap();
        assert_eq!(user.display_name(), "a@b.c");
    }
}
