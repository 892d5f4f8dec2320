pub mod error;
pub mod memory;
pub mod user_repo;

pub use error::RepoError;
pub use memory::InMemoryUserStore;
pub use user_repo::{NewUser, PgUserStore, ProfileUpdate, UserRecord, UserStatus, UserStore};
