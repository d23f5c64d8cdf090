use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::error::DomainError;
use crate::domain::user::User;
use crate::infrastructure::ephemeral_store::EphemeralStore;

/// Copy of the user taken at login. Later profile edits do not reach live sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionUser {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) token: String,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) user: SessionUser,
}

/// Opaque bearer sessions kept in an [`EphemeralStore`] keyed by token.
pub(crate) struct SessionManager {
    store: Arc<EphemeralStore<Session>>,
    ttl: Duration,
    remember_ttl: Duration,
}

impl SessionManager {
    const TOKEN_BYTES: usize = 32;

    pub(crate) fn new(store: Arc<EphemeralStore<Session>>, ttl: Duration, remember_ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            remember_ttl,
        }
    }

    pub(crate) fn store(&self) -> Arc<EphemeralStore<Session>> {
        self.store.clone()
    }

    pub(crate) fn issue(&self, user: SessionUser, remember: bool) -> Session {
        let ttl = if remember { self.remember_ttl } else { self.ttl };
        let session = Session {
            token: generate_token(),
            expires_at: self.store.deadline(ttl),
            user,
        };
        self.store
            .set_until(session.token.clone(), session.clone(), session.expires_at);

        debug!(user_id = session.user.id, remember, "session issued");
        session
    }

    pub(crate) fn resolve(&self, token: &str) -> Result<SessionUser, DomainError> {
        self.store
            .get(token)
            .map(|session| session.user)
            .ok_or(DomainError::Unauthenticated)
    }

    pub(crate) fn revoke(&self, token: &str) {
        self.store.delete(token);
    }
}

fn generate_token() -> String {
    let bytes: [u8; SessionManager::TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}
