//! Password hashing, role tags and the route access gate.

pub mod gate;
pub mod password;
pub mod roles;

pub use gate::AccessGate;
pub use password::{hash_password, verify_dummy, verify_password};
