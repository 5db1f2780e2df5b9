use crate::db::connection::get_connection;
use crate::db::error::RepositoryError;
use crate::db::models::account::{Account, NewAccount};
use crate::db::models::post::Post;
use crate::db::models::session::{NewSession, Session};
use crate::db::models::user::{NewUser, UpdateUser, User};
use crate::db::schema::{accounts, posts, sessions, users};
use diesel::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

pub struct UserRepository;

impl UserRepository {
    pub fn find_by_email(email: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = get_connection()?;

        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn find_by_id(id: Uuid) -> Result<Option<User>, RepositoryError> {
        let mut conn = get_connection()?;

        users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    /// User together with their posts, oldest first.
    pub fn find_with_posts(id: Uuid) -> Result<Option<(User, Vec<Post>)>, RepositoryError> {
        let mut conn = get_connection()?;

        let Some(user) = users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let posts = Post::belonging_to(&user)
            .select(Post::as_select())
            .order(posts::created_at.asc())
            .load(&mut conn)?;

        Ok(Some((user, posts)))
    }

    pub fn create(new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    fn insert_with_credential(
        conn: &mut PgConnection,
        new_user: &NewUser,
        password_hash: &str,
    ) -> Result<(User, Account), RepositoryError> {
        let user = diesel::insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(conn)?;

        let account = diesel::insert_into(accounts::table)
            .values(&NewAccount::credential(user.id, password_hash.to_string()))
            .returning(Account::as_returning())
            .get_result(conn)?;

        Ok((user, account))
    }

    /// Creates the user and its `credential` account atomically.
    /// A duplicate email rolls both inserts back with `UniqueViolation`.
    pub fn create_with_credential(
        new_user: &NewUser,
        password_hash: &str,
    ) -> Result<(User, Account), RepositoryError> {
        let mut conn = get_connection()?;

        conn.transaction::<_, RepositoryError, _>(|conn| {
            Self::insert_with_credential(conn, new_user, password_hash)
        })
    }

    /// Sign-up write: user, credential account and first session commit
    /// together or not at all.
    pub fn create_with_session<F>(
        new_user: &NewUser,
        password_hash: &str,
        new_session: F,
    ) -> Result<(User, Session), RepositoryError>
    where
        F: FnOnce(Uuid) -> NewSession,
    {
        let mut conn = get_connection()?;

        conn.transaction::<_, RepositoryError, _>(|conn| {
            let (user, _account) = Self::insert_with_credential(conn, new_user, password_hash)?;

            let session = diesel::insert_into(sessions::table)
                .values(&new_session(user.id))
                .returning(Session::as_returning())
                .get_result(conn)?;

            Ok((user, session))
        })
    }

    pub fn update(id: Uuid, changes: &UpdateUser) -> Result<User, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::update(users::table.find(id))
            .set(changes)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    pub fn mark_email_verified(id: Uuid) -> Result<User, RepositoryError> {
        let changes = UpdateUser {
            email_verified: Some(true),
            ..Default::default()
        };
        Self::update(id, &changes)
    }

    /// Deletes the user; accounts, sessions and posts go with it.
    pub fn delete(id: Uuid) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;

        let deleted = diesel::delete(users::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound(format!("User {id}")));
        }

        Ok(())
    }
}
