use async_trait::async_trait;

use crate::models::User;

/// Outbound account emails
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_welcome(&self, user: &User, url: &str) -> anyhow::Result<()>;

    async fn send_password_reset(&self, user: &User, url: &str) -> anyhow::Result<()>;
}

const WELCOME_SUBJECT: &str = "Welcome to the Natours Family!";
const PASSWORD_RESET_SUBJECT: &str = "Your password reset token (valid for only 10 minutes)";

fn first_name(user: &User) -> &str {
    user.name.split_whitespace().next().unwrap_or(&user.name)
}

fn welcome_body(user: &User, url: &str) -> String {
    format!(
        "Hi {},\n\nWelcome to Natours, we're glad to have you!\n\
         Upload your photo and manage your account here: {}\n",
        first_name(user),
        url
    )
}

fn password_reset_body(user: &User, url: &str) -> String {
    format!(
        "Hi {},\n\nForgot your password? Submit a PATCH request with your new \
         password and confirmPassword to: {}\n\n\
         If you didn't forget your password, please ignore this email!\n",
        first_name(user),
        url
    )
}

/// Development sender: writes emails to the log instead of delivering them
#[derive(Clone, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_welcome(&self, user: &User, url: &str) -> anyhow::Result<()> {
        tracing::info!(to = %user.email, subject = WELCOME_SUBJECT, "email not delivered (log mode)");
        tracing::debug!(body = %welcome_body(user, url), "welcome email");
        Ok(())
    }

    async fn send_password_reset(&self, user: &User, url: &str) -> anyhow::Result<()> {
        tracing::info!(
            to = %user.email,
            subject = PASSWORD_RESET_SUBJECT,
            "email not delivered (log mode)"
        );
        // reset link only at debug level; it grants account access
        tracing::debug!(body = %password_reset_body(user, url), "password reset email");
        Ok(())
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpEmailSender;

#[cfg(feature = "email")]
mod smtp {
    use anyhow::Context;
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
    use secrecy::ExposeSecret;

    use super::{
        EmailSender, PASSWORD_RESET_SUBJECT, WELCOME_SUBJECT, password_reset_body, welcome_body,
    };
    use crate::config::Config;
    use crate::models::User;

    /// SMTP sender (STARTTLS relay)
    #[derive(Clone)]
    pub struct SmtpEmailSender {
        mailer: AsyncSmtpTransport<Tokio1Executor>,
        from: String,
    }

    impl SmtpEmailSender {
        /// Build from config; `None` when SMTP is not fully configured
        pub fn from_config(config: &Config) -> anyhow::Result<Option<Self>> {
            let (Some(host), Some(username), Some(password), Some(from)) = (
                &config.smtp_host,
                &config.smtp_username,
                &config.smtp_password,
                &config.smtp_from_address,
            ) else {
                return Ok(None);
            };

            let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .context("invalid SMTP relay")?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    username.expose_secret().clone(),
                    password.expose_secret().clone(),
                ))
                .build();

            Ok(Some(Self {
                mailer,
                from: from.clone(),
            }))
        }

        async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
            let message = Message::builder()
                .from(self.from.parse().context("invalid from address")?)
                .to(to.parse().context("invalid recipient address")?)
                .subject(subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body)
                .context("failed to build email")?;

            self.mailer
                .send(message)
                .await
                .context("SMTP delivery failed")?;

            tracing::info!(to = %to, subject = %subject, "email delivered");
            Ok(())
        }
    }

    #[async_trait]
    impl EmailSender for SmtpEmailSender {
        async fn send_welcome(&self, user: &User, url: &str) -> anyhow::Result<()> {
            self.send(&user.email, WELCOME_SUBJECT, welcome_body(user, url))
                .await
        }

        async fn send_password_reset(&self, user: &User, url: &str) -> anyhow::Result<()> {
            self.send(
                &user.email,
                PASSWORD_RESET_SUBJECT,
                password_reset_body(user, url),
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_user;

    #[test]
    fn test_bodies_contain_url_and_first_name() {
        let mut user = sample_user();
        user.name = "Jonas Schmedtmann".to_string();

        let body = password_reset_body(&user, "http://app/reset/abc");
        assert!(body.starts_with("Hi Jonas,"));
        assert!(body.contains("http://app/reset/abc"));

        assert!(welcome_body(&user, "http://app/me").contains("http://app/me"));
    }

    #[tokio::test]
    async fn test_log_sender_succeeds() {
        let user = sample_user();
        let sender = LogEmailSender;
        assert!(sender.send_welcome(&user, "http://app/me").await.is_ok());
        assert!(sender.send_password_reset(&user, "http://app/r").await.is_ok());
    }
}
