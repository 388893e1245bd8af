pub mod user;

pub use user::{NewUser, UserChanges, UserRepository};
