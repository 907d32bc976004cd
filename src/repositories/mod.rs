pub mod user;

pub use user::{PgUserStore, UserStore};
