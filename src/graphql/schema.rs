use async_graphql::extensions::Tracing;
use async_graphql::{EmptySubscription, Schema};

use super::mutations::MutationRoot;
use super::queries::QueryRoot;
use crate::state::Services;

/// GraphQL Schema type
pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema. Per-request caller identity is attached to each
/// request as a `RequestSession`.
pub fn build_schema(services: Services) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(services)
        .extension(Tracing)
        .finish()
}
