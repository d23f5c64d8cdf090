use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use tracing::{info, warn};

use crate::application::session_manager::{Session, SessionManager, SessionUser};
use crate::application::verification_manager::VerificationManager;
use crate::data::user_repository::{NewUser, UserRepository};
use crate::domain::error::DomainError;
use crate::domain::user::{LoginIdentity, LoginRequest, RegisterRequest, User, normalize_email};
use crate::infrastructure::code_dispatch::CodeDispatcher;

#[derive(Debug, Clone)]
pub(crate) struct AuthResult {
    pub(crate) user: User,
    pub(crate) session: Session,
}

pub(crate) struct AuthService<R: UserRepository> {
    repo: R,
    sessions: Arc<SessionManager>,
    codes: Arc<VerificationManager>,
    dispatcher: Arc<dyn CodeDispatcher>,
}

impl<R: UserRepository> AuthService<R> {
    const DUMMY_PASSWORD_HASH: &'static str = "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$gwN6hT1sNdk9kI95f7n2Gl3fL0qRmBf2Ffkj2r90/0M";

    pub(crate) fn new(
        repo: R,
        sessions: Arc<SessionManager>,
        codes: Arc<VerificationManager>,
        dispatcher: Arc<dyn CodeDispatcher>,
    ) -> Self {
        Self {
            repo,
            sessions,
            codes,
            dispatcher,
        }
    }

    pub(crate) async fn register(&self, req: RegisterRequest) -> Result<User, DomainError> {
        let req = req.validate()?;

        if self.repo.find_by_username(&req.username).await?.is_some() {
            return Err(DomainError::AlreadyExists("username".to_string()));
        }
        if self.repo.find_by_email(&req.email).await?.is_some() {
            return Err(DomainError::AlreadyExists("email".to_string()));
        }

        let password_hash = self.hash_password(&req.password)?;
        let user = self
            .repo
            .create_user(Self::into_new_user(req, password_hash))
            .await?;

        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    pub(crate) async fn login(&self, req: LoginRequest) -> Result<AuthResult, DomainError> {
        let req = req.validate()?;

        let found = match &req.identity {
            LoginIdentity::Email(email) => self.repo.find_by_email(email).await?,
            LoginIdentity::Username(username) => self.repo.find_by_username(username).await?,
        };

        let user_creds = match found {
            Some(user_creds) => user_creds,
            None => {
                // keep timing close to the found-user path
                match self.verify_password(&req.password, Self::DUMMY_PASSWORD_HASH) {
                    Ok(()) | Err(DomainError::InvalidCredentials) => {}
                    Err(err) => return Err(err),
                }
                warn!("login rejected: unknown identity");
                return Err(DomainError::InvalidCredentials);
            }
        };

        if let Err(err) = self.verify_password(&req.password, &user_creds.password_hash) {
            warn!(user_id = user_creds.user.id, "login rejected: bad password");
            return Err(err);
        }

        let session = self
            .sessions
            .issue(SessionUser::from(&user_creds.user), req.remember);

        info!(user_id = user_creds.user.id, remember = req.remember, "user logged in");
        Ok(AuthResult {
            user: user_creds.user,
            session,
        })
    }

    pub(crate) fn logout(&self, token: &str) {
        self.sessions.revoke(token);
        info!("session revoked");
    }

    pub(crate) fn current_user(&self, token: &str) -> Result<SessionUser, DomainError> {
        self.sessions.resolve(token)
    }

    /// Issues a code only for an email that belongs to a registered user.
    pub(crate) async fn send_verification_code(&self, email: &str) -> Result<(), DomainError> {
        let email = normalize_email(email).map_err(|_| DomainError::UserNotFound)?;

        if self.repo.find_by_email(&email).await?.is_none() {
            return Err(DomainError::UserNotFound);
        }

        let issued = self.codes.issue(&email);
        self.dispatcher.dispatch(&issued).await
    }

    /// The code is consumed before the user row is updated. If that update fails the code is
    /// already spent and the user has to request a new one.
    pub(crate) async fn verify_code(&self, email: &str, code: &str) -> Result<(), DomainError> {
        // no code is ever issued for an address that does not normalize
        let email = normalize_email(email).map_err(|_| DomainError::CodeExpiredOrAbsent)?;

        if let Err(err) = self.codes.verify(&email, code) {
            warn!(error = %err, "verification code rejected");
            return Err(err);
        }

        if !self.repo.mark_verified(&email).await? {
            return Err(DomainError::UserNotFound);
        }

        info!("email verified");
        Ok(())
    }

    pub(crate) fn hash_password(&self, raw_password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Self::argon2()?
            .hash_password(raw_password.as_bytes(), &salt)
            .map_err(|err| DomainError::Unexpected(err.to_string()))?;
        Ok(password_hash.to_string())
    }

    pub(crate) fn verify_password(
        &self,
        raw_password: &str,
        password_hash: &str,
    ) -> Result<(), DomainError> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|err| DomainError::Unexpected(err.to_string()))?;
        Self::argon2()?
            .verify_password(raw_password.as_bytes(), &parsed_hash)
            .map_err(|err| match err {
                PasswordHashError::Password => DomainError::InvalidCredentials,
                _ => DomainError::Unexpected(err.to_string()),
            })?;

        Ok(())
    }

    pub(crate) fn into_new_user(req: RegisterRequest, password_hash: String) -> NewUser {
        NewUser {
            username: req.username,
            email: req.email,
            password_hash,
        }
    }

    fn argon2() -> Result<Argon2<'static>, DomainError> {
        let params = Params::new(19 * 1024, 2, 1, None)
            .map_err(|err| DomainError::Unexpected(err.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::AuthService;
    use crate::application::session_manager::SessionManager;
    use crate::application::verification_manager::{IssuedCode, VerificationManager};
    use crate::data::user_repository::{NewUser, UserCredentials, UserRepository};
    use crate::domain::error::DomainError;
    use crate::domain::user::{LoginRequest, RegisterRequest, User};
    use crate::infrastructure::code_dispatch::CodeDispatcher;
    use crate::infrastructure::ephemeral_store::EphemeralStore;

    #[derive(Clone)]
    struct FakeUserRepo {
        created_input: Arc<Mutex<Option<NewUser>>>,
        login_credentials: Arc<Mutex<Option<UserCredentials>>>,
        verified_emails: Arc<Mutex<Vec<String>>>,
        create_user_out: User,
    }

    impl FakeUserRepo {
        fn new(create_user_out: User) -> Self {
            Self {
                created_input: Arc::new(Mutex::new(None)),
                login_credentials: Arc::new(Mutex::new(None)),
                verified_emails: Arc::new(Mutex::new(Vec::new())),
                create_user_out,
            }
        }

        fn set_login_credentials(&self, creds: Option<UserCredentials>) {
            *self
                .login_credentials
                .lock()
                .expect("login credentials mutex poisoned") = creds;
        }

        fn take_created_input(&self) -> Option<NewUser> {
            self.created_input
                .lock()
                .expect("created input mutex poisoned")
                .take()
        }

        fn credentials_matching(
            &self,
            matches: impl Fn(&User) -> bool,
        ) -> Option<UserCredentials> {
            self.login_credentials
                .lock()
                .expect("login credentials mutex poisoned")
                .clone()
                .filter(|creds| matches(&creds.user))
        }
    }

    #[async_trait]
    impl UserRepository for FakeUserRepo {
        async fn create_user(&self, input: NewUser) -> Result<User, DomainError> {
            *self
                .created_input
                .lock()
                .expect("created input mutex poisoned") = Some(input);
            Ok(self.create_user_out.clone())
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserCredentials>, DomainError> {
            Ok(self.credentials_matching(|user| user.username == username))
        }

        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<UserCredentials>, DomainError> {
            Ok(self.credentials_matching(|user| user.email == email))
        }

        async fn find_by_ids(&self, _ids: &[i64]) -> Result<HashMap<i64, User>, DomainError> {
            Ok(HashMap::new())
        }

        async fn mark_verified(&self, email: &str) -> Result<bool, DomainError> {
            let known = self.credentials_matching(|user| user.email == email).is_some();
            if known {
                self.verified_emails
                    .lock()
                    .expect("verified emails mutex poisoned")
                    .push(email.to_string());
            }
            Ok(known)
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<IssuedCode>>,
    }

    impl RecordingDispatcher {
        fn last_code(&self) -> Option<String> {
            self.sent
                .lock()
                .expect("sent mutex poisoned")
                .last()
                .map(|issued| issued.code.clone())
        }
    }

    #[async_trait]
    impl CodeDispatcher for RecordingDispatcher {
        async fn dispatch(&self, issued: &IssuedCode) -> Result<(), DomainError> {
            self.sent
                .lock()
                .expect("sent mutex poisoned")
                .push(issued.clone());
            Ok(())
        }
    }

    struct Harness {
        repo: FakeUserRepo,
        codes: Arc<VerificationManager>,
        dispatcher: Arc<RecordingDispatcher>,
        service: AuthService<FakeUserRepo>,
    }

    fn harness() -> Harness {
        let repo = FakeUserRepo::new(sample_user(1, "valid_user", "valid@example.com"));
        let sessions = Arc::new(SessionManager::new(
            Arc::new(EphemeralStore::new()),
            Duration::hours(24),
            Duration::days(7),
        ));
        let codes = Arc::new(VerificationManager::new(
            Arc::new(EphemeralStore::new()),
            Duration::minutes(10),
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let service = AuthService::new(repo.clone(), sessions, codes.clone(), dispatcher.clone());
        Harness {
            repo,
            codes,
            dispatcher,
            service,
        }
    }

    fn with_known_user(h: &Harness, password: &str) {
        let hash = h
            .service
            .hash_password(password)
            .expect("hash must be created");
        h.repo.set_login_credentials(Some(UserCredentials {
            user: sample_user(1, "valid_user", "valid@example.com"),
            password_hash: hash,
        }));
    }

    fn login_request(username: &str, password: &str, remember: bool) -> LoginRequest {
        LoginRequest {
            username: Some(username.to_string()),
            email: None,
            password: password.to_string(),
            remember,
        }
    }

    #[tokio::test]
    async fn register_normalizes_and_hashes_before_create() {
        let h = harness();

        let req = RegisterRequest {
            username: "  valid_user  ".to_string(),
            email: "  VALID@EXAMPLE.COM  ".to_string(),
            password: "very-secure-password".to_string(),
        };

        let user = h.service.register(req).await.expect("register must succeed");
        assert_eq!(user.username, "valid_user");

        let created = h
            .repo
            .take_created_input()
            .expect("create_user must be called");
        assert_eq!(created.username, "valid_user");
        assert_eq!(created.email, "valid@example.com");
        assert_ne!(created.password_hash, "very-secure-password");
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let h = harness();
        with_known_user(&h, "correct-password");

        let req = RegisterRequest {
            username: "another_user".to_string(),
            email: "valid@example.com".to_string(),
            password: "very-secure-password".to_string(),
        };

        let err = h.service.register(req).await.expect_err("must conflict");
        assert!(matches!(err, DomainError::AlreadyExists(ref what) if what == "email"));
        assert!(h.repo.take_created_input().is_none());
    }

    #[tokio::test]
    async fn login_returns_invalid_credentials_for_missing_user() {
        let h = harness();
        h.repo.set_login_credentials(None);

        let err = h
            .service
            .login(login_request("valid_user", "some-password", false))
            .await
            .expect_err("login must fail");
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_returns_invalid_credentials_for_wrong_password() {
        let h = harness();
        with_known_user(&h, "correct-password");

        let err = h
            .service
            .login(login_request("valid_user", "wrong-password", false))
            .await
            .expect_err("login must fail");
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_issues_session_that_resolves_and_revokes() {
        let h = harness();
        with_known_user(&h, "correct-password");

        let result = h
            .service
            .login(login_request("valid_user", "correct-password", true))
            .await
            .expect("login must succeed");
        assert_eq!(result.user.id, 1);
        assert!(result.session.expires_at > Utc::now() + Duration::days(6));

        let current = h
            .service
            .current_user(&result.session.token)
            .expect("session must resolve");
        assert_eq!(current.username, "valid_user");

        h.service.logout(&result.session.token);
        let err = h
            .service
            .current_user(&result.session.token)
            .expect_err("revoked session must fail");
        assert!(matches!(err, DomainError::Unauthenticated));
    }

    #[tokio::test]
    async fn login_by_email_finds_user() {
        let h = harness();
        with_known_user(&h, "correct-password");

        let req = LoginRequest {
            username: None,
            email: Some("VALID@example.com".to_string()),
            password: "correct-password".to_string(),
            remember: false,
        };
        let result = h.service.login(req).await.expect("login must succeed");
        assert_eq!(result.session.user.email, "valid@example.com");
    }

    #[tokio::test]
    async fn send_code_for_unknown_email_creates_nothing() {
        let h = harness();

        let err = h
            .service
            .send_verification_code("nobody@example.com")
            .await
            .expect_err("unknown email must fail");
        assert!(matches!(err, DomainError::UserNotFound));
        assert_eq!(h.codes.store().len(), 0);
        assert!(h.dispatcher.last_code().is_none());
    }

    #[tokio::test]
    async fn verification_flow_marks_user_verified() {
        let h = harness();
        with_known_user(&h, "correct-password");

        h.service
            .send_verification_code(" Valid@Example.com ")
            .await
            .expect("code must be sent");
        let code = h.dispatcher.last_code().expect("code must be dispatched");

        let wrong = if code == "000000" { "000001" } else { "000000" };
        let err = h
            .service
            .verify_code("valid@example.com", wrong)
            .await
            .expect_err("wrong code must fail");
        assert!(matches!(err, DomainError::CodeMismatch));

        h.service
            .verify_code("valid@example.com", &code)
            .await
            .expect("right code must pass");
        assert_eq!(
            *h.repo
                .verified_emails
                .lock()
                .expect("verified emails mutex poisoned"),
            vec!["valid@example.com".to_string()]
        );

        let err = h
            .service
            .verify_code("valid@example.com", &code)
            .await
            .expect_err("code is single-use");
        assert!(matches!(err, DomainError::CodeExpiredOrAbsent));
    }

    #[tokio::test]
    async fn verify_code_normalizes_email_like_send_code() {
        let h = harness();
        with_known_user(&h, "correct-password");

        h.service
            .send_verification_code("valid@example.com")
            .await
            .expect("code must be sent");
        let code = h.dispatcher.last_code().expect("code must be dispatched");

        h.service
            .verify_code("  VALID@Example.COM ", &code)
            .await
            .expect("normalized email must match the issued code");

        let err = h
            .service
            .verify_code("not-an-email", &code)
            .await
            .expect_err("malformed email has no code");
        assert!(matches!(err, DomainError::CodeExpiredOrAbsent));
    }

    fn sample_user(id: i64, username: &str, email: &str) -> User {
        User::new(id, username.to_string(), email.to_string(), false, Utc::now())
            .expect("sample user must be valid")
    }
}
