pub mod auth;
pub mod role;

pub use auth::{CurrentUser, SESSION_COOKIE, Viewer, is_logged_in, protect};
pub use role::{RoleGuard, require_role, restrict_to};
