use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::error::DomainError;
use crate::infrastructure::ephemeral_store::{ConsumeOutcome, EphemeralStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssuedCode {
    pub(crate) email: String,
    pub(crate) code: String,
    pub(crate) expires_at: DateTime<Utc>,
}

/// Six-digit email verification codes, one live code per email.
pub(crate) struct VerificationManager {
    store: Arc<EphemeralStore<String>>,
    ttl: Duration,
}

impl VerificationManager {
    pub(crate) fn new(store: Arc<EphemeralStore<String>>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub(crate) fn store(&self) -> Arc<EphemeralStore<String>> {
        self.store.clone()
    }

    /// Issues a fresh code for `email`, invalidating any earlier one.
    pub(crate) fn issue(&self, email: &str) -> IssuedCode {
        let email = normalize_key(email);
        let code = generate_code();
        let expires_at = self.store.set(email.clone(), code.clone(), self.ttl);
        IssuedCode {
            email,
            code,
            expires_at,
        }
    }

    /// A wrong code keeps the stored one valid; a matching code is consumed.
    pub(crate) fn verify(&self, email: &str, code: &str) -> Result<(), DomainError> {
        let email = normalize_key(email);
        let code = code.trim();
        match self.store.consume(&email, |stored| stored == code) {
            ConsumeOutcome::Consumed(_) => Ok(()),
            ConsumeOutcome::Rejected => Err(DomainError::CodeMismatch),
            ConsumeOutcome::Absent => Err(DomainError::CodeExpiredOrAbsent),
        }
    }
}

fn normalize_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_code() -> String {
    format!("{:06}", rand::random_range(0..1_000_000_u32))
}
