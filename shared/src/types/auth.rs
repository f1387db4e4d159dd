use serde::{Deserialize, Serialize};

use super::user::User;

// ---------------------------------------------------------------------------
// Auth wire types
// ---------------------------------------------------------------------------

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationData {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// What a successful login or registration carries besides `success`.
/// Registration may omit both, in which case no auto-login happens.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub user: User,
}

// ---------------------------------------------------------------------------
// Form errors (checked locally before any request)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFormError {
    MissingField(String),
    InvalidEmail,
}

impl AuthFormError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidEmail => "INVALID_EMAIL",
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            Self::MissingField(field) => format!("Missing required field: {}", field),
            Self::InvalidEmail => "Invalid email format".to_string(),
        }
    }
}

impl LoginData {
    pub fn validate(&self) -> Result<(), AuthFormError> {
        require("username", &self.username)?;
        require("password", &self.password)
    }
}

impl RegistrationData {
    pub fn validate(&self) -> Result<(), AuthFormError> {
        require("username", &self.username)?;
        require("email", &self.email)?;
        require("password", &self.password)?;

        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(AuthFormError::InvalidEmail),
        }
    }
}

fn require(name: &str, value: &str) -> Result<(), AuthFormError> {
    if value.trim().is_empty() {
        Err(AuthFormError::MissingField(name.to_string()))
    } else {
        Ok(())
    }
}
