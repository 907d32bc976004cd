pub mod auth;
pub mod health;
pub mod password;
pub mod session;
pub mod users;

pub use auth::{login, logout, signup};
pub use health::health_check;
pub use password::{forgot_password, reset_password, update_my_password};
pub use users::{get_me, get_user, viewer};
