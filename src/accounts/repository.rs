// Repository pattern - isolates all user table side effects
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{NewUser, User};
use crate::db::{format_datetime, parse_datetime, RepositoryError};
use crate::state::DbPool;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account. Duplicate username/email yields `Conflict`.
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    /// Look up by username OR email; either may be absent.
    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Account holding this reset token digest, if it has not expired.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now_ms: i64,
    ) -> Result<Option<User>, RepositoryError>;

    async fn update_email(
        &self,
        id: &str,
        email: &str,
        avatar: &str,
    ) -> Result<User, RepositoryError>;

    async fn update_password(&self, id: &str, password_hash: &str)
        -> Result<User, RepositoryError>;

    /// Store a reset token digest unless a live one is already pending.
    /// Returns whether the token was stored.
    async fn store_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        expires_at_ms: i64,
        now_ms: i64,
    ) -> Result<bool, RepositoryError>;

    /// Set a new password and clear the reset token in one step. Returns
    /// `None` when the token was already consumed or expired.
    async fn consume_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        password_hash: &str,
        now_ms: i64,
    ) -> Result<Option<User>, RepositoryError>;

    /// Drop a stored reset token, but only if it is still `token_hash`.
    async fn clear_reset_token(&self, id: &str, token_hash: &str)
        -> Result<bool, RepositoryError>;

    async fn soft_delete(&self, id: &str) -> Result<(), RepositoryError>;

    /// Add or remove a post from the user's liked set.
    async fn set_liked(&self, user_id: &str, post_id: &str, liked: bool)
        -> Result<(), RepositoryError>;

    /// Pull a post from every user's liked set. Returns affected rows.
    async fn remove_liked_post_from_all_users(&self, post_id: &str)
        -> Result<u64, RepositoryError>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, avatar, \
     password_reset_token_hash, password_reset_expires_at, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        avatar: row.get(4)?,
        liked_posts: Vec::new(),
        password_reset_token_hash: row.get(5)?,
        password_reset_expires_at: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn load_liked_posts(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT post_id FROM liked_posts WHERE user_id = ?1 ORDER BY rowid")?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Run a single-row query against `active_users` and attach the liked set.
fn query_active_user<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> rusqlite::Result<Option<User>> {
    let sql = format!("SELECT {} FROM active_users WHERE {}", USER_COLUMNS, filter);
    let user = conn.query_row(&sql, params, user_from_row).optional()?;

    match user {
        Some(mut user) => {
            user.liked_posts = load_liked_posts(conn, &user.id)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

/// SQLite implementation
pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn reload(conn: &Connection, id: &str) -> Result<User, RepositoryError> {
        query_active_user(conn, "id = ?1", params![id])?
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        let now = format_datetime(Utc::now());

        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, avatar, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                user.id,
                user.username,
                user.email,
                user.password_hash,
                user.avatar,
                now
            ],
        )
        .map_err(RepositoryError::from_write)?;

        Self::reload(&conn, &user.id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(query_active_user(&conn, "id = ?1", params![id])?)
    }

    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }

        let conn = self.pool.get()?;
        Ok(query_active_user(
            &conn,
            "username = ?1 OR email = ?2",
            params![username, email],
        )?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(query_active_user(&conn, "email = ?1", params![email])?)
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now_ms: i64,
    ) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(query_active_user(
            &conn,
            "password_reset_token_hash = ?1 AND password_reset_expires_at > ?2",
            params![token_hash, now_ms],
        )?)
    }

    async fn update_email(
        &self,
        id: &str,
        email: &str,
        avatar: &str,
    ) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET email = ?2, avatar = ?3, updated_at = ?4
             WHERE id = ?1 AND is_deleted = 0",
            params![id, email, avatar, format_datetime(Utc::now())],
        )
        .map_err(RepositoryError::from_write)?;

        Self::reload(&conn, id)
    }

    async fn update_password(
        &self,
        id: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3
             WHERE id = ?1 AND is_deleted = 0",
            params![id, password_hash, format_datetime(Utc::now())],
        )?;

        Self::reload(&conn, id)
    }

    async fn store_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        expires_at_ms: i64,
        now_ms: i64,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users
             SET password_reset_token_hash = ?2, password_reset_expires_at = ?3
             WHERE id = ?1 AND is_deleted = 0
               AND (password_reset_expires_at IS NULL OR password_reset_expires_at <= ?4)",
            params![id, token_hash, expires_at_ms, now_ms],
        )?;
        Ok(rows > 0)
    }

    async fn consume_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        password_hash: &str,
        now_ms: i64,
    ) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users
             SET password_hash = ?3,
                 password_reset_token_hash = NULL,
                 password_reset_expires_at = NULL,
                 updated_at = ?5
             WHERE id = ?1 AND is_deleted = 0
               AND password_reset_token_hash = ?2
               AND password_reset_expires_at > ?4",
            params![
                id,
                token_hash,
                password_hash,
                now_ms,
                format_datetime(Utc::now())
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        Self::reload(&conn, id).map(Some)
    }

    async fn clear_reset_token(
        &self,
        id: &str,
        token_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users
             SET password_reset_token_hash = NULL, password_reset_expires_at = NULL
             WHERE id = ?1 AND password_reset_token_hash = ?2",
            params![id, token_hash],
        )?;
        Ok(rows > 0)
    }

    async fn soft_delete(&self, id: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET is_deleted = 1, updated_at = ?2 WHERE id = ?1",
            params![id, format_datetime(Utc::now())],
        )?;
        Ok(())
    }

    async fn set_liked(
        &self,
        user_id: &str,
        post_id: &str,
        liked: bool,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        if liked {
            conn.execute(
                "INSERT OR IGNORE INTO liked_posts (user_id, post_id) VALUES (?1, ?2)",
                params![user_id, post_id],
            )?;
        } else {
            conn.execute(
                "DELETE FROM liked_posts WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
            )?;
        }
        Ok(())
    }

    async fn remove_liked_post_from_all_users(
        &self,
        post_id: &str,
    ) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM liked_posts WHERE post_id = ?1", params![post_id])?;
        Ok(rows as u64)
    }
}
