use chrono::{DateTime, Utc};

/// Username shown for authors whose account has been deleted.
pub const DELETED_USERNAME: &str = "[deleted]";

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
    /// Liked post ids, in the order they were liked
    pub liked_posts: Vec<String>,
    pub password_reset_token_hash: Option<String>,
    /// Unix milliseconds
    pub password_reset_expires_at: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_liked(&self, post_id: &str) -> bool {
        self.liked_posts.iter().any(|id| id == post_id)
    }

    /// Whether a reset token was issued and has not expired yet.
    pub fn has_pending_reset(&self, now: DateTime<Utc>) -> bool {
        match (&self.password_reset_token_hash, self.password_reset_expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now.timestamp_millis(),
            _ => false,
        }
    }
}

/// Fields written when an account is created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
}

/// Public view of a post's author. The row may belong to a deleted account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: Author,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            avatar: "avatar".into(),
            liked_posts: vec!["p1".into()],
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn has_liked_checks_membership() {
        let u = user();
        assert!(u.has_liked("p1"));
        assert!(!u.has_liked("p2"));
    }

    #[test]
    fn pending_reset_requires_hash_and_future_expiry() {
        let now = Utc::now();
        let mut u = user();
        assert!(!u.has_pending_reset(now));

        u.password_reset_token_hash = Some("digest".into());
        u.password_reset_expires_at = Some((now + Duration::minutes(5)).timestamp_millis());
        assert!(u.has_pending_reset(now));

        u.password_reset_expires_at = Some((now - Duration::minutes(1)).timestamp_millis());
        assert!(!u.has_pending_reset(now));
    }
}
