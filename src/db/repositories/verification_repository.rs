use crate::db::connection::get_connection;
use crate::db::error::RepositoryError;
use crate::db::models::verification::{NewVerification, Verification};
use crate::db::schema::verifications;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct VerificationRepository;

impl VerificationRepository {
    pub fn create(new_verification: &NewVerification) -> Result<Verification, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::insert_into(verifications::table)
            .values(new_verification)
            .returning(Verification::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    pub fn find_by_id(id: Uuid) -> Result<Option<Verification>, RepositoryError> {
        let mut conn = get_connection()?;

        verifications::table
            .find(id)
            .select(Verification::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn find_by_value(value: &str) -> Result<Option<Verification>, RepositoryError> {
        let mut conn = get_connection()?;

        verifications::table
            .filter(verifications::value.eq(value))
            .select(Verification::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    pub fn delete(id: Uuid) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::delete(verifications::table.find(id))
            .execute(&mut conn)
            .map_err(Into::into)
    }

    /// Removes every pending verification for `identifier`.
    pub fn delete_by_identifier(identifier: &str) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::delete(verifications::table.filter(verifications::identifier.eq(identifier)))
            .execute(&mut conn)
            .map_err(Into::into)
    }

    pub fn delete_expired(now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::delete(verifications::table.filter(verifications::expires_at.le(now)))
            .execute(&mut conn)
            .map_err(Into::into)
    }
}
