use crate::db::models::user::User;
use crate::db::schema::accounts;
use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use uuid::Uuid;

/// Provider id of email/password accounts.
pub const CREDENTIAL_PROVIDER: &str = "credential";

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub account_id: String,
    pub provider_id: String,
    pub user_id: Uuid,
    /// bcrypt hash, never a plaintext password
    pub password: Option<String>,
}

impl NewAccount {
    /// Email/password account. `password_hash` must already be hashed.
    pub fn credential(user_id: Uuid, password_hash: String) -> Self {
        Self {
            account_id: user_id.to_string(),
            provider_id: CREDENTIAL_PROVIDER.to_string(),
            user_id,
            password: Some(password_hash),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: Uuid,
    pub account_id: String,
    pub provider_id: String,
    pub user_id: Uuid,
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
