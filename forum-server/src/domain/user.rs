use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use super::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password: String,
}

impl RegisterRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let username = normalize_register_username(&self.username)?;
        let email = normalize_email(&self.email)?;
        let password_len = self.password.chars().count();
        if !(8..=128).contains(&password_len) {
            return Err(DomainError::Validation {
                field: "password",
                message: "must be 8..128 chars",
            });
        }
        Ok(Self {
            username,
            email,
            password: self.password,
        })
    }
}

/// Who is trying to log in. Email wins when both are supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoginIdentity {
    Email(String),
    Username(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) username: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) password: String,
    pub(crate) remember: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidatedLogin {
    pub(crate) identity: LoginIdentity,
    pub(crate) password: String,
    pub(crate) remember: bool,
}

impl LoginRequest {
    pub(crate) fn validate(self) -> Result<ValidatedLogin, DomainError> {
        if self.password.is_empty() {
            return Err(DomainError::Validation {
                field: "password",
                message: "must not be empty",
            });
        }

        let email = self
            .email
            .as_deref()
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty());
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|username| !username.is_empty());

        let identity = match (email, username) {
            (Some(email), _) => LoginIdentity::Email(email),
            (None, Some(username)) => {
                if username.len() > 64 {
                    return Err(DomainError::Validation {
                        field: "username",
                        message: "must be 1..64 chars",
                    });
                }
                LoginIdentity::Username(username.to_string())
            }
            (None, None) => {
                return Err(DomainError::Validation {
                    field: "username",
                    message: "username or email is required",
                });
            }
        };

        Ok(ValidatedLogin {
            identity,
            password: self.password,
            remember: self.remember,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) verified: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl User {
    pub(crate) fn new(
        id: i64,
        username: impl Into<String>,
        email: impl Into<String>,
        verified: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::Validation {
                field: "id",
                message: "must be > 0",
            });
        }
        let username = normalize_register_username(&username.into())?;
        let email = normalize_email(&email.into())?;

        Ok(Self {
            id,
            username,
            email,
            verified,
            created_at,
        })
    }

    pub(crate) fn author_summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Public face of a post creator in feed responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AuthorSummary {
    pub(crate) id: i64,
    pub(crate) username: String,
}

fn normalize_register_username(username: &str) -> Result<String, DomainError> {
    let username = username.trim();
    if username.len() < 3 || username.len() > 64 {
        return Err(DomainError::Validation {
            field: "username",
            message: "must be 3..64 chars",
        });
    }
    Ok(username.to_string())
}

pub(crate) fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(DomainError::Validation {
            field: "email",
            message: "must be a valid email",
        });
    }
    Ok(email)
}
