use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `development` or `production`; only production marks cookies `Secure`
    #[serde(default = "default_app_env")]
    pub app_env: String,
    /// Public base URL used in links sent by email
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,

    // Session token settings
    pub jwt_secret: SecretBox<String>,
    #[serde(default = "default_jwt_expires_in_days")]
    pub jwt_expires_in_days: i64,
    #[serde(default = "default_jwt_cookie_expires_in_days")]
    pub jwt_cookie_expires_in_days: i64,

    // SMTP settings (only read when the `email` feature is enabled)
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,

    // Password reset settings
    #[serde(default = "default_password_reset_token_ttl_secs")]
    pub password_reset_token_ttl_secs: i64,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_APP_ENV: &str = "development";
const DEFAULT_APP_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_JWT_EXPIRES_IN_DAYS: i64 = 90;
const DEFAULT_JWT_COOKIE_EXPIRES_IN_DAYS: i64 = 90;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 10 * 60;

const MAX_SESSION_DAYS: i64 = 3650;
const MAX_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_app_env() -> String {
    DEFAULT_APP_ENV.to_string()
}

fn default_app_url() -> String {
    DEFAULT_APP_URL.to_string()
}

fn default_jwt_expires_in_days() -> i64 {
    DEFAULT_JWT_EXPIRES_IN_DAYS
}

fn default_jwt_cookie_expires_in_days() -> i64 {
    DEFAULT_JWT_COOKIE_EXPIRES_IN_DAYS
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_password_reset_token_ttl_secs() -> i64 {
    DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS
}

impl Config {
    /// Load from the environment and check value ranges
    ///
    /// # Errors
    /// Missing or unparsable variables, or durations outside their range
    pub fn load() -> anyhow::Result<Self> {
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Durations are added to timestamps on every request; out-of-range
    /// values must fail here, not at first use
    pub fn validate(&self) -> anyhow::Result<()> {
        check_range("JWT_EXPIRES_IN_DAYS", self.jwt_expires_in_days, 1, MAX_SESSION_DAYS)?;
        check_range(
            "JWT_COOKIE_EXPIRES_IN_DAYS",
            self.jwt_cookie_expires_in_days,
            1,
            MAX_SESSION_DAYS,
        )?;
        check_range(
            "PASSWORD_RESET_TOKEN_TTL_SECS",
            self.password_reset_token_ttl_secs,
            1,
            MAX_PASSWORD_RESET_TOKEN_TTL_SECS,
        )?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Base URL without a trailing slash
    pub fn app_url(&self) -> &str {
        self.app_url.trim_end_matches('/')
    }
}

fn check_range(name: &str, value: i64, min: i64, max: i64) -> anyhow::Result<()> {
    if !(min..=max).contains(&value) {
        anyhow::bail!("{name} must be between {min} and {max}, got {value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_from(vars: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn test_defaults_applied() {
        let config = load_from(&[
            ("DATABASE_URL", "postgres://localhost/natours"),
            ("JWT_SECRET", "secret"),
        ])
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_expires_in_days, 90);
        assert_eq!(config.jwt_cookie_expires_in_days, 90);
        assert_eq!(config.password_reset_token_ttl_secs, 600);
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_jwt_secret_is_error() {
        let result = load_from(&[("DATABASE_URL", "postgres://localhost/natours")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_production_and_trailing_slash() {
        let config = load_from(&[
            ("DATABASE_URL", "postgres://localhost/natours"),
            ("JWT_SECRET", "secret"),
            ("APP_ENV", "Production"),
            ("APP_URL", "https://natours.example/"),
        ])
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.app_url(), "https://natours.example");
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        let base = [
            ("DATABASE_URL", "postgres://localhost/natours"),
            ("JWT_SECRET", "secret"),
        ];

        let config = load_from(&base).unwrap();
        assert!(config.validate().is_ok());

        for (name, value) in [
            ("JWT_COOKIE_EXPIRES_IN_DAYS", "100000000"),
            ("JWT_EXPIRES_IN_DAYS", "0"),
            ("JWT_EXPIRES_IN_DAYS", "-5"),
            ("PASSWORD_RESET_TOKEN_TTL_SECS", "9999999999"),
        ] {
            let mut vars = base.to_vec();
            vars.push((name, value));
            let err = load_from(&vars).unwrap().validate().unwrap_err();
            assert!(err.to_string().starts_with(name), "{name}={value}: {err}");
        }
    }
}
