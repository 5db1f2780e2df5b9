use crate::db::connection::get_connection;
use crate::db::error::RepositoryError;
use crate::db::models::session::{NewSession, Session};
use crate::db::models::user::User;
use crate::db::schema::{sessions, users};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct SessionRepository;

impl SessionRepository {
    pub fn create(new_session: &NewSession) -> Result<Session, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::insert_into(sessions::table)
            .values(new_session)
            .returning(Session::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    /// Looks a session up by token regardless of expiry.
    pub fn find_by_token(token: &str) -> Result<Option<Session>, RepositoryError> {
        let mut conn = get_connection()?;

        sessions::table
            .filter(sessions::token.eq(token))
            .select(Session::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    /// Session with its owning user included.
    pub fn find_by_token_with_user(
        token: &str,
    ) -> Result<Option<(Session, User)>, RepositoryError> {
        let mut conn = get_connection()?;

        sessions::table
            .inner_join(users::table)
            .filter(sessions::token.eq(token))
            .select((Session::as_select(), User::as_select()))
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn update_expiry(id: Uuid, expires_at: DateTime<Utc>) -> Result<Session, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::update(sessions::table.find(id))
            .set(sessions::expires_at.eq(expires_at))
            .returning(Session::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    /// Returns the number of rows removed (0 or 1).
    pub fn delete_by_token(token: &str) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::delete(sessions::table.filter(sessions::token.eq(token)))
            .execute(&mut conn)
            .map_err(Into::into)
    }

    pub fn delete_by_user(user_id: Uuid) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::delete(sessions::table.filter(sessions::user_id.eq(user_id)))
            .execute(&mut conn)
            .map_err(Into::into)
    }

    pub fn delete_expired(now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
            .execute(&mut conn)
            .map_err(Into::into)
    }
}
