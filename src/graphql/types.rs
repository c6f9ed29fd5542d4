use async_graphql::{SimpleObject, ID};
use chrono::{DateTime, Utc};

use crate::db::models::{Author, Post, User};
use crate::posts::{PostFeed, ToggleLikeOutcome};

/// Public profile of a post author
#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserObject {
    pub id: ID,
    pub username: String,
    pub avatar: String,
}

impl From<Author> for UserObject {
    fn from(author: Author) -> Self {
        Self {
            id: ID(author.id),
            username: author.username,
            avatar: author.avatar,
        }
    }
}

/// The signed-in account, including private fields
#[derive(Clone, Debug, SimpleObject)]
pub struct Me {
    pub id: ID,
    pub username: String,
    pub avatar: String,
    pub email: String,
    pub liked_posts: Vec<ID>,
}

impl From<User> for Me {
    fn from(user: User) -> Self {
        Self {
            id: ID(user.id),
            username: user.username,
            avatar: user.avatar,
            email: user.email,
            liked_posts: user.liked_posts.into_iter().map(ID).collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Post")]
pub struct PostObject {
    pub id: ID,
    pub content: String,
    pub author: UserObject,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostObject {
    fn from(post: Post) -> Self {
        Self {
            id: ID(post.id),
            content: post.content,
            author: post.author.into(),
            likes_count: post.likes_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PostFeed")]
pub struct PostFeedObject {
    /// Number of posts in this page
    pub results: Option<i32>,
    pub posts: Vec<PostObject>,
    pub cursor: Option<ID>,
    pub has_next_page: bool,
}

impl From<PostFeed> for PostFeedObject {
    fn from(feed: PostFeed) -> Self {
        Self {
            results: Some(feed.results as i32),
            posts: feed.posts.into_iter().map(Into::into).collect(),
            cursor: feed.cursor.map(ID),
            has_next_page: feed.has_next_page,
        }
    }
}

#[derive(Clone, Copy, Debug, SimpleObject)]
pub struct ToggleLikeResult {
    pub likes_count: i64,
    pub liked: bool,
}

impl From<ToggleLikeOutcome> for ToggleLikeResult {
    fn from(outcome: ToggleLikeOutcome) -> Self {
        Self {
            likes_count: outcome.likes_count,
            liked: outcome.liked,
        }
    }
}

pub fn post_list(posts: Vec<Post>) -> Vec<PostObject> {
    posts.into_iter().map(Into::into).collect()
}
