use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use holochat_api::weather::WeatherConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_MAIL_FROM: &str = "Holochat <holochat450@gmail.com>";

pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub weather: WeatherConfig,
}

impl Config {
    /// Read configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("HOLOCHAT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HOLOCHAT_JWT_SECRET is unset or still a placeholder");
        }

        let port = match var("HOLOCHAT_PORT").or_else(|| var("PORT")) {
            Some(raw) => raw.parse().with_context(|| format!("invalid port {raw:?}"))?,
            None => 5000,
        };

        let smtp = match (var("SMTP_HOST"), var("SMTP_USERNAME"), var("SMTP_PASSWORD")) {
            (Some(host), Some(username), Some(password)) => Some(SmtpConfig { host, username, password }),
            _ => None,
        };

        let defaults = WeatherConfig::default();
        let weather = WeatherConfig {
            zip_api_url: var("ZIP_API_URL").unwrap_or(defaults.zip_api_url),
            zip_api_key: var("ZIP_API_KEY").unwrap_or_default(),
            weather_api_url: var("WEATHER_API_URL").unwrap_or(defaults.weather_api_url),
            weather_api_key: var("WEATHER_API_KEY").unwrap_or_default(),
        };

        Ok(Self {
            jwt_secret,
            db_path: var("HOLOCHAT_DB_PATH").unwrap_or_else(|| "holochat.db".into()).into(),
            host: var("HOLOCHAT_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            smtp,
            mail_from: var("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.into()),
            weather,
        })
    }
}
