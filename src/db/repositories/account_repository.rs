use crate::db::connection::get_connection;
use crate::db::error::RepositoryError;
use crate::db::models::account::{Account, CREDENTIAL_PROVIDER, NewAccount};
use crate::db::schema::accounts;
use diesel::prelude::*;
use uuid::Uuid;

pub struct AccountRepository;

impl AccountRepository {
    pub fn create(new_account: &NewAccount) -> Result<Account, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::insert_into(accounts::table)
            .values(new_account)
            .returning(Account::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    /// The email/password account of a user, if any.
    pub fn find_credential(user_id: Uuid) -> Result<Option<Account>, RepositoryError> {
        let mut conn = get_connection()?;

        accounts::table
            .filter(accounts::user_id.eq(user_id))
            .filter(accounts::provider_id.eq(CREDENTIAL_PROVIDER))
            .select(Account::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn find_by_user(user_id: Uuid) -> Result<Vec<Account>, RepositoryError> {
        let mut conn = get_connection()?;

        accounts::table
            .filter(accounts::user_id.eq(user_id))
            .select(Account::as_select())
            .order(accounts::created_at.asc())
            .load(&mut conn)
            .map_err(Into::into)
    }
}
