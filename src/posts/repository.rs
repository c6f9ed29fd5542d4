// Repository pattern - isolates all post table side effects
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Author, Post, DELETED_USERNAME};
use crate::db::{format_datetime, parse_datetime, RepositoryError};
use crate::state::DbPool;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, id: &str, content: &str, author_id: &str)
        -> Result<Post, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, RepositoryError>;

    async fn update_content(&self, id: &str, content: &str) -> Result<Post, RepositoryError>;

    async fn soft_delete(&self, id: &str) -> Result<(), RepositoryError>;

    /// Atomically add `delta` to the like counter, flooring at zero.
    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<(), RepositoryError>;

    /// Newest-first page of posts with ids below `cursor`, at most `limit` rows.
    async fn feed(&self, cursor: Option<&str>, limit: usize)
        -> Result<Vec<Post>, RepositoryError>;

    async fn by_author(&self, author_id: &str) -> Result<Vec<Post>, RepositoryError>;

    /// Posts in the user's liked set, newest first.
    async fn liked_by(&self, user_id: &str) -> Result<Vec<Post>, RepositoryError>;
}

// Authors are joined from `users`, not `active_users`: deleted accounts keep
// their posts' author reference.
const POST_SELECT: &str = "SELECT p.id, p.content, p.likes_count, p.created_at, p.updated_at, \
            u.id, u.username, u.avatar, u.is_deleted \
     FROM active_posts p JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let author_deleted: bool = row.get(8)?;
    let username: String = row.get(6)?;

    Ok(Post {
        id: row.get(0)?,
        content: row.get(1)?,
        likes_count: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
        author: Author {
            id: row.get(5)?,
            username: if author_deleted {
                DELETED_USERNAME.to_string()
            } else {
                username
            },
            avatar: row.get(7)?,
        },
    })
}

fn query_posts<P: rusqlite::Params>(
    conn: &Connection,
    tail: &str,
    params: P,
) -> rusqlite::Result<Vec<Post>> {
    let sql = format!("{} {}", POST_SELECT, tail);
    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(params, post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// SQLite implementation
pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn load(conn: &Connection, id: &str) -> rusqlite::Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
        conn.query_row(&sql, params![id], post_from_row).optional()
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(
        &self,
        id: &str,
        content: &str,
        author_id: &str,
    ) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        let now = format_datetime(Utc::now());

        conn.execute(
            "INSERT INTO posts (id, content, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, content, author_id, now],
        )?;

        Self::load(&conn, id)?.ok_or_else(|| RepositoryError::NotFound(format!("post {}", id)))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(Self::load(&conn, id)?)
    }

    async fn update_content(&self, id: &str, content: &str) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE posts SET content = ?2, updated_at = ?3 WHERE id = ?1 AND is_deleted = 0",
            params![id, content, format_datetime(Utc::now())],
        )?;

        Self::load(&conn, id)?.ok_or_else(|| RepositoryError::NotFound(format!("post {}", id)))
    }

    async fn soft_delete(&self, id: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE posts SET is_deleted = 1, updated_at = ?2 WHERE id = ?1",
            params![id, format_datetime(Utc::now())],
        )?;
        Ok(())
    }

    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE posts SET likes_count = MAX(likes_count + ?2, 0) WHERE id = ?1",
            params![id, delta],
        )?;
        Ok(())
    }

    async fn feed(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        let limit = limit as i64;

        let posts = match cursor {
            Some(cursor) => query_posts(
                &conn,
                "WHERE p.id < ?1 ORDER BY p.id DESC LIMIT ?2",
                params![cursor, limit],
            )?,
            None => query_posts(&conn, "ORDER BY p.id DESC LIMIT ?1", params![limit])?,
        };
        Ok(posts)
    }

    async fn by_author(&self, author_id: &str) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(query_posts(
            &conn,
            "WHERE p.author_id = ?1 ORDER BY p.id DESC",
            params![author_id],
        )?)
    }

    async fn liked_by(&self, user_id: &str) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(query_posts(
            &conn,
            "WHERE p.id IN (SELECT post_id FROM liked_posts WHERE user_id = ?1) ORDER BY p.id DESC",
            params![user_id],
        )?)
    }
}
