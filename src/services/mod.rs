pub mod auth;
pub mod email;
pub mod password_reset;
pub mod token;

pub use auth::AuthService;
#[cfg(feature = "email")]
pub use email::SmtpEmailSender;
pub use email::{EmailSender, LogEmailSender};
pub use password_reset::PasswordResetService;
pub use token::{Claims, TokenService};
