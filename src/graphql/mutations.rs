use async_graphql::*;

use super::request_parts;
use super::types::{Me, PostObject, ToggleLikeResult};
use crate::accounts::{AccountService, SignedIn};
use crate::auth::require_authenticated;
use crate::auth::session::{attach_session, detach_session};
use crate::posts::PostService;
use crate::state::Services;

fn start_session(ctx: &Context<'_>, services: &Services, signed_in: SignedIn) -> Me {
    attach_session(
        ctx,
        &services.config.auth,
        &signed_in.token,
        signed_in.persistent,
    );
    signed_in.user.into()
}

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Sign in with a username or an email
    async fn sign_in(
        &self,
        ctx: &Context<'_>,
        username: Option<String>,
        email: Option<String>,
        password: String,
        rememberme: Option<bool>,
    ) -> Result<Me> {
        let (services, _) = request_parts(ctx)?;
        let signed_in = AccountService::new(services)
            .sign_in(
                username.as_deref(),
                email.as_deref(),
                &password,
                rememberme.unwrap_or(false),
            )
            .await
            .map_err(|e| e.extend())?;

        Ok(start_session(ctx, services, signed_in))
    }

    async fn sign_up(
        &self,
        ctx: &Context<'_>,
        username: String,
        email: String,
        password: String,
        rememberme: Option<bool>,
    ) -> Result<Me> {
        let (services, _) = request_parts(ctx)?;
        let signed_in = AccountService::new(services)
            .sign_up(&username, &email, &password, rememberme.unwrap_or(false))
            .await
            .map_err(|e| e.extend())?;

        Ok(start_session(ctx, services, signed_in))
    }

    async fn sign_out(&self, ctx: &Context<'_>) -> Result<bool> {
        let (services, _) = request_parts(ctx)?;
        detach_session(ctx, &services.config.auth);
        Ok(true)
    }

    /// Change the caller's email. The avatar follows the email.
    async fn update_user(&self, ctx: &Context<'_>, email: String) -> Result<Me> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to update your email.")
            .map_err(|e| e.extend())?;

        AccountService::new(services)
            .update_email(caller, &email)
            .await
            .map(Into::into)
            .map_err(|e| e.extend())
    }

    async fn delete_user(&self, ctx: &Context<'_>, password: String) -> Result<ID> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(
            session,
            "You need to be signed in to delete your account.",
        )
        .map_err(|e| e.extend())?;

        AccountService::new(services)
            .delete_account(caller, &password)
            .await
            .map(ID)
            .map_err(|e| e.extend())
    }

    async fn update_password(
        &self,
        ctx: &Context<'_>,
        current_password: String,
        new_password: String,
    ) -> Result<Me> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to update password.")
            .map_err(|e| e.extend())?;

        AccountService::new(services)
            .update_password(caller, &current_password, &new_password)
            .await
            .map(Into::into)
            .map_err(|e| e.extend())
    }

    /// Email a single-use password reset link
    async fn forgot_password(&self, ctx: &Context<'_>, email: String) -> Result<String> {
        let (services, _) = request_parts(ctx)?;
        AccountService::new(services)
            .forgot_password(&email)
            .await
            .map_err(|e| e.extend())
    }

    async fn reset_password(
        &self,
        ctx: &Context<'_>,
        reset_token: String,
        password: String,
    ) -> Result<Me> {
        let (services, _) = request_parts(ctx)?;
        let signed_in = AccountService::new(services)
            .reset_password(&reset_token, &password)
            .await
            .map_err(|e| e.extend())?;

        Ok(start_session(ctx, services, signed_in))
    }

    async fn create_post(&self, ctx: &Context<'_>, content: String) -> Result<PostObject> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to create a post.")
            .map_err(|e| e.extend())?;

        PostService::new(services)
            .create_post(caller, &content)
            .await
            .map(Into::into)
            .map_err(|e| e.extend())
    }

    async fn update_post(&self, ctx: &Context<'_>, id: ID, content: String) -> Result<PostObject> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to update a post.")
            .map_err(|e| e.extend())?;

        PostService::new(services)
            .update_post(caller, &id, &content)
            .await
            .map(Into::into)
            .map_err(|e| e.extend())
    }

    async fn delete_post(&self, ctx: &Context<'_>, id: ID) -> Result<ID> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to delete a post.")
            .map_err(|e| e.extend())?;

        PostService::new(services)
            .delete_post(caller, &id)
            .await
            .map(ID)
            .map_err(|e| e.extend())
    }

    /// Like the post, or take the like back
    async fn toggle_like(&self, ctx: &Context<'_>, id: ID) -> Result<ToggleLikeResult> {
        let (services, session) = request_parts(ctx)?;
        let caller = require_authenticated(session, "You need to be signed in to like a post.")
            .map_err(|e| e.extend())?;

        PostService::new(services)
            .toggle_like(caller, &id)
            .await
            .map(Into::into)
            .map_err(|e| e.extend())
    }
}
