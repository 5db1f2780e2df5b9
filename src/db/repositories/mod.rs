pub mod account_repository;
pub mod post_repository;
pub mod session_repository;
pub mod user_repository;
pub mod verification_repository;

pub use account_repository::AccountRepository;
pub use post_repository::PostRepository;
pub use session_repository::SessionRepository;
pub use user_repository::UserRepository;
pub use verification_repository::VerificationRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::password::PasswordManager;
    use crate::db::connection::init_test_pool;
    use crate::db::models::user::{NewUser, User};
    use crate::db::repositories::UserRepository;
    use uuid::Uuid;

    pub const TEST_PASSWORD: &str = "Secret123";

    pub fn unique_email(prefix: &str) -> String {
        format!("{prefix}_{}@example.com", Uuid::new_v4().simple())
    }

    /// Inserts a user with a bcrypt-hashed credential account.
    pub fn create_test_user(prefix: &str) -> User {
        init_test_pool();

        let hash = PasswordManager::hash(TEST_PASSWORD).expect("hash");
        let (user, _) = UserRepository::create_with_credential(
            &NewUser::new(unique_email(prefix), "Test User"),
            &hash,
        )
        .expect("Failed to create test user");
        user
    }
}
