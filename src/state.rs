use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::accounts::repository::{SqliteUserRepository, UserRepository};
use crate::auth::tokens::TokenService;
use crate::config::Config;
use crate::graphql::AppSchema;
use crate::mailer::Mailer;
use crate::posts::repository::{PostRepository, SqlitePostRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Everything the account and post flows need, shared across requests.
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub tokens: Arc<TokenService>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl Services {
    pub fn new(
        db: DbPool,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        Self {
            users: Arc::new(SqliteUserRepository::new(db.clone())),
            posts: Arc::new(SqlitePostRepository::new(db)),
            tokens: Arc::new(tokens),
            mailer,
            config: Arc::new(config),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub graphql_schema: AppSchema,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        let graphql_schema = crate::graphql::build_schema(services.clone());
        Self {
            services,
            graphql_schema,
        }
    }
}
