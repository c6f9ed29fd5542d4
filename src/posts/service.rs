use crate::accounts::validation::Validation;
use crate::auth::gate::require_ownership;
use crate::db::models::{Post, User};
use crate::error::{AppError, AppResult};
use crate::state::Services;

pub const DEFAULT_FEED_LIMIT: usize = 10;
pub const MAX_FEED_LIMIT: usize = 100;

const POST_NOT_FOUND: &str = "No post with given id exists.";

/// One page of the newest-first feed.
#[derive(Debug, Clone)]
pub struct PostFeed {
    pub results: usize,
    pub posts: Vec<Post>,
    /// Id to pass back for the next page; `None` on the last page.
    pub cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleLikeOutcome {
    pub likes_count: i64,
    pub liked: bool,
}

/// Post ids are UUIDs; anything else is rejected before touching the store.
pub fn parse_id(raw: &str) -> AppResult<String> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::BadRequest(format!("Invalid id: {}", raw)))
}

pub struct PostService<'a> {
    services: &'a Services,
}

impl<'a> PostService<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self { services }
    }

    async fn existing(&self, id: &str) -> AppResult<Post> {
        self.services
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(POST_NOT_FOUND.to_string()))
    }

    pub async fn post(&self, id: &str) -> AppResult<Post> {
        let id = parse_id(id)?;
        self.existing(&id).await
    }

    pub async fn create_post(&self, caller: &User, content: &str) -> AppResult<Post> {
        Validation::new().content(content).finish()?;

        let id = uuid::Uuid::now_v7().to_string();
        let post = self
            .services
            .posts
            .create(&id, content.trim(), &caller.id)
            .await?;
        tracing::debug!(post_id = %post.id, author_id = %caller.id, "Post created");
        Ok(post)
    }

    pub async fn update_post(&self, caller: &User, id: &str, content: &str) -> AppResult<Post> {
        let id = parse_id(id)?;
        let post = self.existing(&id).await?;
        require_ownership(
            &post.author.id,
            &caller.id,
            "You do not have permission to update this post.",
        )?;

        Validation::new().content(content).finish()?;

        Ok(self
            .services
            .posts
            .update_content(&id, content.trim())
            .await?)
    }

    pub async fn delete_post(&self, caller: &User, id: &str) -> AppResult<String> {
        let id = parse_id(id)?;
        let post = self.existing(&id).await?;
        require_ownership(
            &post.author.id,
            &caller.id,
            "You do not have permission to delete this post.",
        )?;

        self.services.posts.soft_delete(&id).await?;
        let unliked = self
            .services
            .users
            .remove_liked_post_from_all_users(&id)
            .await?;
        tracing::debug!(post_id = %id, unliked, "Post deleted");

        Ok(id)
    }

    /// Flip the caller's like on a post. The returned count is derived from
    /// the count read before the write, not re-read afterwards.
    pub async fn toggle_like(&self, caller: &User, id: &str) -> AppResult<ToggleLikeOutcome> {
        let id = parse_id(id)?;
        let post = self.existing(&id).await?;

        let liked = !caller.has_liked(&id);
        let delta = if liked { 1 } else { -1 };

        self.services.users.set_liked(&caller.id, &id, liked).await?;
        self.services.posts.adjust_likes(&id, delta).await?;

        Ok(ToggleLikeOutcome {
            likes_count: (post.likes_count + delta).max(0),
            liked,
        })
    }

    pub async fn post_feed(&self, cursor: Option<&str>, limit: Option<i32>) -> AppResult<PostFeed> {
        let cursor = cursor.map(parse_id).transpose()?;
        let limit = limit
            .map(|l| l.clamp(1, MAX_FEED_LIMIT as i32) as usize)
            .unwrap_or(DEFAULT_FEED_LIMIT);

        let mut posts = self
            .services
            .posts
            .feed(cursor.as_deref(), limit + 1)
            .await?;

        let has_next_page = posts.len() > limit;
        if has_next_page {
            posts.truncate(limit);
        }

        let cursor = if has_next_page {
            posts.last().map(|p| p.id.clone())
        } else {
            None
        };

        Ok(PostFeed {
            results: posts.len(),
            posts,
            cursor,
            has_next_page,
        })
    }

    pub async fn my_posts(&self, caller: &User) -> AppResult<Vec<Post>> {
        Ok(self.services.posts.by_author(&caller.id).await?)
    }

    pub async fn my_liked_posts(&self, caller: &User) -> AppResult<Vec<Post>> {
        Ok(self.services.posts.liked_by(&caller.id).await?)
    }
}
