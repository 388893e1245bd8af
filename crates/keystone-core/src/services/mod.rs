pub mod user;

pub use user::{Registration, UserService};
