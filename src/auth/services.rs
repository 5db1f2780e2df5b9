use crate::auth::password::PasswordManager;
use crate::auth::session_token::{SessionSigner, generate_session_token};
use crate::db::error::RepositoryError;
use crate::db::models::session::{NewSession, Session};
use crate::db::models::user::{NewUser, User};
use crate::db::models::verification::{NewVerification, Verification};
use crate::db::repositories::{
    AccountRepository, SessionRepository, UserRepository, VerificationRepository,
};
use crate::error::AppError;
use blog_auth_api::validation::{LoginForm, SignupForm};
use blog_auth_api::{SignInEmailRequest, SignUpEmailRequest};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

const VERIFICATION_TTL_SECS: i64 = 3600;

/// Session lifetime rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Lifetime of a fresh or refreshed session
    pub expires_in: Duration,
    /// Minimum age before a session is slid forward on read
    pub update_age: Duration,
    /// Marks the session cookie `Secure`
    pub secure_cookies: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            expires_in: Duration::days(7),
            update_age: Duration::days(1),
            secure_cookies: false,
        }
    }
}

impl SessionPolicy {
    /// True once `update_age` has passed since the session was issued or
    /// last extended.
    pub fn needs_refresh(&self, session: &Session, now: chrono::DateTime<Utc>) -> bool {
        session.expires_at - self.expires_in + self.update_age <= now
    }
}

/// Caller details recorded on new sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly created session and the signed credential carrying it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub credential: String,
    pub session: Session,
    pub user: User,
}

/// Result of a session read.
#[derive(Debug, Clone)]
pub struct SessionLookup {
    pub session: Session,
    pub user: User,
    /// Set when the expiry was slid forward
    pub refreshed_credential: Option<String>,
}

pub struct AuthService {
    signer: SessionSigner,
    policy: SessionPolicy,
}

impl AuthService {
    pub fn new(signer: SessionSigner, policy: SessionPolicy) -> Self {
        Self { signer, policy }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Creates the user, its credential account and a first session.
    pub fn sign_up(
        &self,
        request: SignUpEmailRequest,
        meta: RequestMeta,
    ) -> Result<IssuedSession, AppError> {
        let form = SignupForm {
            name: request.name,
            email: request.email,
            password: request.password,
        };
        form.validate()?;

        if UserRepository::find_by_email(&form.email)?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let password_hash = PasswordManager::hash(&form.password)?;
        let (user, session) = UserRepository::create_with_session(
            &NewUser::new(form.email, form.name),
            &password_hash,
            |user_id| self.new_session(user_id, meta),
        )
        .map_err(|e| match e {
            // lost a race with a concurrent sign-up
            RepositoryError::UniqueViolation(_) => AppError::UserAlreadyExists,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "User signed up");
        let credential = self.signer.sign(&session.token, user.id, session.expires_at)?;
        Ok(IssuedSession {
            credential,
            session,
            user,
        })
    }

    /// Checks email/password and opens a session. Unknown email and wrong
    /// password fail identically.
    pub fn sign_in(
        &self,
        request: SignInEmailRequest,
        meta: RequestMeta,
    ) -> Result<IssuedSession, AppError> {
        let form = LoginForm {
            email: request.email,
            password: request.password,
        };
        form.validate()?;

        let Some(user) = UserRepository::find_by_email(&form.email)? else {
            tracing::debug!("Sign-in for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let password_hash = AccountRepository::find_credential(user.id)?
            .and_then(|account| account.password)
            .ok_or(AppError::InvalidCredentials)?;

        if !PasswordManager::verify(&form.password, &password_hash)? {
            tracing::debug!(user_id = %user.id, "Sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User signed in");
        self.issue_session(user, meta)
    }

    fn new_session(&self, user_id: Uuid, meta: RequestMeta) -> NewSession {
        NewSession {
            token: generate_session_token(),
            user_id,
            expires_at: Utc::now() + self.policy.expires_in,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
        }
    }

    fn issue_session(&self, user: User, meta: RequestMeta) -> Result<IssuedSession, AppError> {
        let session = SessionRepository::create(&self.new_session(user.id, meta))?;

        let credential = self.signer.sign(&session.token, user.id, session.expires_at)?;

        Ok(IssuedSession {
            credential,
            session,
            user,
        })
    }

    /// Resolves a signed credential to its live session. Expired sessions
    /// are deleted and reported as absent.
    pub fn resolve(&self, credential: &str) -> Result<Option<(Session, User)>, AppError> {
        let Ok(claims) = self.signer.verify(credential) else {
            return Ok(None);
        };

        let Some((session, user)) = SessionRepository::find_by_token_with_user(&claims.sid)? else {
            return Ok(None);
        };

        if !session.is_active_at(Utc::now()) {
            SessionRepository::delete_by_token(&session.token)?;
            tracing::debug!(session_id = %session.id, "Expired session removed");
            return Ok(None);
        }

        Ok(Some((session, user)))
    }

    /// Like `resolve`, additionally sliding the expiry forward once the
    /// session is older than `update_age`. A slid session comes back with a
    /// re-signed credential for the client to store.
    pub fn get_session(&self, credential: &str) -> Result<Option<SessionLookup>, AppError> {
        let Some((session, user)) = self.resolve(credential)? else {
            return Ok(None);
        };

        let now = Utc::now();
        if !self.policy.needs_refresh(&session, now) {
            return Ok(Some(SessionLookup {
                session,
                user,
                refreshed_credential: None,
            }));
        }

        let session = SessionRepository::update_expiry(session.id, now + self.policy.expires_in)?;
        tracing::debug!(session_id = %session.id, "Session expiry extended");

        let credential = self.signer.sign(&session.token, user.id, session.expires_at)?;
        Ok(Some(SessionLookup {
            session,
            user,
            refreshed_credential: Some(credential),
        }))
    }

    /// Deletes the session named by a validly signed credential, live or
    /// expired. Unverifiable credentials have nothing to delete.
    pub fn sign_out(&self, credential: &str) -> Result<(), AppError> {
        let claims = match self.signer.verify(credential) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Sign-out with unverifiable credential");
                return Ok(());
            }
        };

        let deleted = SessionRepository::delete_by_token(&claims.sid)?;
        tracing::info!(user_id = %claims.sub, deleted, "User signed out");
        Ok(())
    }

    /// Deletes expired sessions and verifications, returning how many of
    /// each were removed.
    pub fn purge_expired(&self) -> Result<(usize, usize), AppError> {
        let now = Utc::now();
        let sessions = SessionRepository::delete_expired(now)?;
        let verifications = VerificationRepository::delete_expired(now)?;

        if sessions + verifications > 0 {
            tracing::debug!(sessions, verifications, "Purged expired records");
        }
        Ok((sessions, verifications))
    }

    /// Stores a one-hour verification token for the user's email. There is
    /// no mail transport; the token is written to the log.
    pub fn send_verification_email(&self, user: &User) -> Result<Verification, AppError> {
        let verification = VerificationRepository::create(&NewVerification {
            identifier: user.email.clone(),
            value: generate_session_token(),
            expires_at: Utc::now() + Duration::seconds(VERIFICATION_TTL_SECS),
        })?;

        tracing::info!(
            user_id = %user.id,
            token = %verification.value,
            "Verification token issued"
        );
        Ok(verification)
    }

    /// Consumes a verification token and marks the email as verified.
    pub fn verify_email(&self, token: &str) -> Result<User, AppError> {
        let verification =
            VerificationRepository::find_by_value(token)?.ok_or(AppError::InvalidToken)?;

        if verification.expires_at <= Utc::now() {
            VerificationRepository::delete(verification.id)?;
            return Err(AppError::InvalidToken);
        }

        let user = UserRepository::find_by_email(&verification.identifier)?
            .ok_or(AppError::InvalidToken)?;
        let user = UserRepository::mark_email_verified(user.id)?;
        VerificationRepository::delete(verification.id)?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::init_test_pool;
    use crate::db::repositories::test_support::unique_email;

    fn make_service() -> AuthService {
        AuthService::new(
            SessionSigner::new("test_secret_for_auth_service"),
            SessionPolicy::default(),
        )
    }

    fn session_expiring_in(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            token: generate_session_token(),
            user_id: Uuid::new_v4(),
            expires_at: now + expires_in,
            ip_address: None,
            user_agent: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sign_up_request(email: &str) -> SignUpEmailRequest {
        SignUpEmailRequest {
            email: email.to_string(),
            password: "Secret123".to_string(),
            name: "Jane Doe".to_string(),
            callback_url: Some("/".to_string()),
        }
    }

    fn sign_in_request(email: &str, password: &str) -> SignInEmailRequest {
        SignInEmailRequest {
            email: email.to_string(),
            password: password.to_string(),
            callback_url: Some("/".to_string()),
        }
    }

    #[test]
    fn fresh_session_does_not_need_refresh() {
        let policy = SessionPolicy::default();
        let session = session_expiring_in(policy.expires_in);

        assert!(!policy.needs_refresh(&session, Utc::now()));
    }

    #[test]
    fn session_older_than_update_age_needs_refresh() {
        let policy = SessionPolicy::default();
        let session = session_expiring_in(policy.expires_in - Duration::days(2));

        assert!(policy.needs_refresh(&session, Utc::now()));
    }

    #[test]
    fn sign_up_rejects_weak_password_before_touching_the_store() {
        let mut request = sign_up_request("weak@example.com");
        request.password = "abcdef".to_string();

        let err = make_service()
            .sign_up(request, RequestMeta::default())
            .expect_err("weak password");

        assert!(matches!(
            err,
            AppError::Validation { ref message, .. }
                if message == "Password must contain at least one uppercase letter, one lowercase letter, and one number"
        ));
    }

    #[test]
    fn sign_in_rejects_malformed_email_before_touching_the_store() {
        let err = make_service()
            .sign_in(sign_in_request("not-an-email", "whatever"), RequestMeta::default())
            .expect_err("bad email");

        assert!(matches!(
            err,
            AppError::Validation { ref message, .. } if message == "Please enter a valid email address"
        ));
    }

    #[test]
    fn resolve_ignores_credentials_with_bad_signature() {
        let forged = SessionSigner::new("someone_else")
            .sign("abc", Uuid::new_v4(), Utc::now() + Duration::hours(1))
            .expect("sign");

        assert!(make_service().resolve(&forged).expect("resolve").is_none());
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn sign_up_then_sign_in_then_sign_out() {
        init_test_pool();
        let service = make_service();
        let email = unique_email("flow");
        let meta = RequestMeta {
            ip_address: Some("198.51.100.1".to_string()),
            user_agent: Some("service-test".to_string()),
        };

        let issued = service.sign_up(sign_up_request(&email), meta.clone()).expect("sign up");
        assert_eq!(issued.user.email, email);
        assert!(!issued.user.email_verified);
        assert_eq!(issued.session.user_agent.as_deref(), Some("service-test"));

        let signed_in = service
            .sign_in(sign_in_request(&email, "Secret123"), meta)
            .expect("sign in");
        let lookup = service
            .get_session(&signed_in.credential)
            .expect("lookup")
            .expect("live session");
        assert_eq!(lookup.session.id, signed_in.session.id);
        assert_eq!(lookup.user.email, email);
        assert!(lookup.refreshed_credential.is_none());
        let user = lookup.user;

        service.sign_out(&signed_in.credential).expect("sign out");
        assert!(service.get_session(&signed_in.credential).expect("lookup").is_none());

        let _ = UserRepository::delete(user.id);
    }

    #[test]
    fn sign_out_with_unverifiable_credential_is_a_no_op() {
        assert!(make_service().sign_out("stale.credential.value").is_ok());
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn failed_session_write_leaves_no_user_behind() {
        init_test_pool();
        let service = make_service();
        let email = unique_email("atomic_signup");
        let oversized = RequestMeta {
            ip_address: Some("x".repeat(80)),
            user_agent: None,
        };

        let err = service
            .sign_up(sign_up_request(&email), oversized)
            .expect_err("session insert fails");
        assert!(matches!(err, AppError::DatabaseError { .. }));
        assert!(UserRepository::find_by_email(&email).expect("query").is_none());

        let retried = service
            .sign_up(sign_up_request(&email), RequestMeta::default())
            .expect("retry succeeds");
        let _ = UserRepository::delete(retried.user.id);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn sign_out_deletes_an_expired_session() {
        init_test_pool();
        let service = make_service();
        let issued = service
            .sign_up(sign_up_request(&unique_email("expired_out")), RequestMeta::default())
            .expect("sign up");
        SessionRepository::update_expiry(issued.session.id, Utc::now() - Duration::hours(1))
            .expect("expire");

        service.sign_out(&issued.credential).expect("sign out");

        assert!(
            SessionRepository::find_by_token(&issued.session.token)
                .expect("query")
                .is_none()
        );
        let _ = UserRepository::delete(issued.user.id);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn duplicate_sign_up_is_user_already_exists() {
        init_test_pool();
        let service = make_service();
        let email = unique_email("dup_signup");

        let first = service
            .sign_up(sign_up_request(&email), RequestMeta::default())
            .expect("first");
        let err = service
            .sign_up(sign_up_request(&email), RequestMeta::default())
            .expect_err("second");

        assert!(matches!(err, AppError::UserAlreadyExists));
        let _ = UserRepository::delete(first.user.id);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn wrong_password_and_unknown_email_fail_identically() {
        init_test_pool();
        let service = make_service();
        let email = unique_email("wrong_pw");
        let issued = service
            .sign_up(sign_up_request(&email), RequestMeta::default())
            .expect("sign up");

        let wrong = service
            .sign_in(sign_in_request(&email, "Secret124"), RequestMeta::default())
            .expect_err("wrong password");
        let unknown = service
            .sign_in(
                sign_in_request(&unique_email("ghost"), "Secret123"),
                RequestMeta::default(),
            )
            .expect_err("unknown email");

        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, AppError::InvalidCredentials));

        let _ = UserRepository::delete(issued.user.id);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn expired_session_is_deleted_on_read() {
        init_test_pool();
        let service = make_service();
        let issued = service
            .sign_up(sign_up_request(&unique_email("expired")), RequestMeta::default())
            .expect("sign up");
        SessionRepository::update_expiry(issued.session.id, Utc::now() - Duration::seconds(1))
            .expect("expire");

        assert!(service.get_session(&issued.credential).expect("lookup").is_none());
        assert!(
            SessionRepository::find_by_token(&issued.session.token)
                .expect("query")
                .is_none()
        );

        let _ = UserRepository::delete(issued.user.id);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn stale_session_is_slid_forward() {
        init_test_pool();
        let service = make_service();
        let issued = service
            .sign_up(sign_up_request(&unique_email("slide")), RequestMeta::default())
            .expect("sign up");
        let aged = Utc::now() + Duration::days(3);
        SessionRepository::update_expiry(issued.session.id, aged).expect("age");

        let lookup = service
            .get_session(&issued.credential)
            .expect("lookup")
            .expect("live");

        assert!(lookup.session.expires_at > aged + Duration::days(3));
        let refreshed = lookup.refreshed_credential.expect("re-signed credential");
        assert!(service.resolve(&refreshed).expect("resolve").is_some());
        let _ = UserRepository::delete(issued.user.id);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn verification_token_marks_email_verified_once() {
        init_test_pool();
        let service = make_service();
        let issued = service
            .sign_up(sign_up_request(&unique_email("verify")), RequestMeta::default())
            .expect("sign up");

        let verification = service
            .send_verification_email(&issued.user)
            .expect("send");
        assert_eq!(verification.identifier, issued.user.email);

        let user = service.verify_email(&verification.value).expect("verify");
        assert!(user.email_verified);

        let again = service.verify_email(&verification.value).expect_err("consumed");
        assert!(matches!(again, AppError::InvalidToken));

        let _ = UserRepository::delete(issued.user.id);
    }

    #[test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    fn purge_expired_removes_stale_sessions_only() {
        init_test_pool();
        let service = make_service();
        let issued = service
            .sign_up(sign_up_request(&unique_email("purge")), RequestMeta::default())
            .expect("sign up");
        let live = service
            .sign_in(
                sign_in_request(&issued.user.email, "Secret123"),
                RequestMeta::default(),
            )
            .expect("sign in");
        SessionRepository::update_expiry(issued.session.id, Utc::now() - Duration::minutes(1))
            .expect("expire");

        let (sessions, _) = service.purge_expired().expect("purge");

        assert!(sessions >= 1);
        assert!(SessionRepository::find_by_token(&issued.session.token).expect("query").is_none());
        assert!(SessionRepository::find_by_token(&live.session.token).expect("query").is_some());

        let _ = UserRepository::delete(issued.user.id);
    }
}
