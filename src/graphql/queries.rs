use async_graphql::*;

use super::request_parts;
use super::types::{post_list, Me, PostFeedObject, PostObject};
use crate::auth::require_authenticated;
use crate::posts::PostService;

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// A single post by id
    async fn post(&self, ctx: &Context<'_>, id: ID) -> Result<PostObject> {
        let (services, _) = request_parts(ctx)?;
        PostService::new(services)
            .post(&id)
            .await
            .map(Into::into)
            .map_err(|e| e.extend())
    }

    /// Newest-first page of posts older than `cursor`
    async fn post_feed(
        &self,
        ctx: &Context<'_>,
        cursor: Option<ID>,
        limit: Option<i32>,
    ) -> Result<PostFeedObject> {
        let (services, _) = request_parts(ctx)?;
        PostService::new(services)
            .post_feed(cursor.as_ref().map(|c| c.as_str()), limit)
            .await
            .map(Into::into)
            .map_err(|e| e.extend())
    }

    async fn me(&self, ctx: &Context<'_>) -> Result<Me> {
        let (_, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to access your profile.")
            .map_err(|e| e.extend())?;
        Ok(caller.clone().into())
    }

    async fn my_posts(&self, ctx: &Context<'_>) -> Result<Vec<PostObject>> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to access your posts.")
            .map_err(|e| e.extend())?;

        PostService::new(services)
            .my_posts(caller)
            .await
            .map(post_list)
            .map_err(|e| e.extend())
    }

    async fn my_liked_posts(&self, ctx: &Context<'_>) -> Result<Vec<PostObject>> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(
            session,
            "You need to be signed in to access your liked posts.",
        )
        .map_err(|e| e.extend())?;

        PostService::new(services)
            .my_liked_posts(caller)
            .await
            .map(post_list)
            .map_err(|e| e.extend())
    }
}
