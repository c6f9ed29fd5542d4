pub mod repository;
pub mod service;

pub use repository::{PostRepository, SqlitePostRepository};
pub use service::{PostFeed, PostService, ToggleLikeOutcome};
