//! Role tags carried by a session principal.
//!
//! Roles are plain strings compared exactly; there is no hierarchy.

pub const USER: &str = "user";
pub const ADMIN: &str = "admin";
pub const SUBADMIN: &str = "subadmin";

pub const ALL: [&str; 3] = [USER, ADMIN, SUBADMIN];

/// Exact, case-sensitive membership check. An empty `required` list admits
/// every role.
pub fn satisfies(role: &str, required: &[&str]) -> bool {
    required.is_empty() || required.iter().any(|r| *r == role)
}
