use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::user::User;

#[derive(Debug, Clone)]
pub(crate) struct UserCredentials {
    pub(crate) user: User,
    pub(crate) password_hash: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewUser {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
}

#[async_trait]
pub(crate) trait UserRepository: Send + Sync {
    async fn create_user(&self, input: NewUser) -> Result<User, DomainError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserCredentials>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, DomainError>;
    /// One round trip for the whole batch; unknown ids are simply absent from the map.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, User>, DomainError>;
    /// Returns `false` when no user has this email.
    async fn mark_verified(&self, email: &str) -> Result<bool, DomainError>;
}
