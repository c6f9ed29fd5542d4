pub mod repository;
pub mod service;
pub mod validation;

pub use repository::{SqliteUserRepository, UserRepository};
pub use service::{AccountService, SignedIn};
