pub mod current_user;
pub mod json;

pub use current_user::{CurrentUser, MaybeUser};
pub use json::{Json, ValidatedJson};
