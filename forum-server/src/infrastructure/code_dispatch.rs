use async_trait::async_trait;
use tracing::{debug, info};

use crate::application::verification_manager::IssuedCode;
use crate::domain::error::DomainError;

/// Delivers an issued verification code to its owner.
#[async_trait]
pub(crate) trait CodeDispatcher: Send + Sync {
    async fn dispatch(&self, issued: &IssuedCode) -> Result<(), DomainError>;
}

/// Development dispatcher: writes the code to the log instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LogCodeDispatcher;

#[async_trait]
impl CodeDispatcher for LogCodeDispatcher {
    async fn dispatch(&self, issued: &IssuedCode) -> Result<(), DomainError> {
        info!(email = %issued.email, expires_at = %issued.expires_at, "verification code issued");
        debug!(email = %issued.email, code = %issued.code, "verification code");
        Ok(())
    }
}
