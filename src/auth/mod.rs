pub mod credentials;
pub mod gate;
pub mod session;
pub mod tokens;

pub use gate::{require_authenticated, require_ownership};
pub use session::{resolve_caller, RequestSession};
pub use tokens::TokenService;
