pub mod mutations;
pub mod queries;
pub mod schema;
pub mod types;

pub use schema::{build_schema, AppSchema};

use async_graphql::{Context, Result};

use crate::auth::RequestSession;
use crate::state::Services;

static ANONYMOUS: RequestSession = RequestSession::anonymous();

/// Shared services and the caller for the current request. Requests executed
/// without a session are anonymous.
pub(crate) fn request_parts<'a>(
    ctx: &Context<'a>,
) -> Result<(&'a Services, &'a RequestSession)> {
    let services = ctx.data::<Services>()?;
    let session = ctx.data_opt::<RequestSession>().unwrap_or(&ANONYMOUS);
    Ok((services, session))
}
