pub mod guard;
pub mod identity;

pub use guard::{AccessGuard, AuthError, Guarded, Policy, check_ownership};
pub use identity::Identity;
