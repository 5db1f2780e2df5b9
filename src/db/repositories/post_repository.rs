use crate::db::connection::get_connection;
use crate::db::error::RepositoryError;
use crate::db::models::post::{NewPost, Post, PostFilter, UpdatePost};
use crate::db::models::user::User;
use crate::db::schema::{posts, users};
use diesel::prelude::*;
use uuid::Uuid;

pub struct PostRepository;

impl PostRepository {
    pub fn create(new_post: &NewPost) -> Result<Post, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::insert_into(posts::table)
            .values(new_post)
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    pub fn find_by_id(id: Uuid) -> Result<Option<Post>, RepositoryError> {
        let mut conn = get_connection()?;

        posts::table
            .find(id)
            .select(Post::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    /// Post with its author included.
    pub fn find_by_id_with_author(id: Uuid) -> Result<Option<(Post, User)>, RepositoryError> {
        let mut conn = get_connection()?;

        posts::table
            .inner_join(users::table)
            .filter(posts::id.eq(id))
            .select((Post::as_select(), User::as_select()))
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    /// Posts matching `filter`, oldest first.
    pub fn find_many(filter: &PostFilter) -> Result<Vec<Post>, RepositoryError> {
        let mut conn = get_connection()?;

        let mut query = posts::table.select(Post::as_select()).into_boxed();
        if let Some(author_id) = filter.author_id {
            query = query.filter(posts::author_id.eq(author_id));
        }
        if let Some(published) = filter.published {
            query = query.filter(posts::published.eq(published));
        }

        query
            .order((posts::created_at.asc(), posts::id.asc()))
            .load(&mut conn)
            .map_err(Into::into)
    }

    pub fn update(id: Uuid, changes: &UpdatePost) -> Result<Post, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::update(posts::table.find(id))
            .set(changes)
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    pub fn delete(id: Uuid) -> Result<(), RepositoryError> {
        let mut conn = get_connection()?;

        let deleted = diesel::delete(posts::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound(format!("Post {id}")));
        }

        Ok(())
    }

    pub fn delete_by_author(author_id: Uuid) -> Result<usize, RepositoryError> {
        let mut conn = get_connection()?;

        diesel::delete(posts::table.filter(posts::author_id.eq(author_id)))
            .execute(&mut conn)
            .map_err(Into::into)
    }
}
