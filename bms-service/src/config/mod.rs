use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct BmsConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub session: SessionConfig,
    pub uploads: UploadConfig,
    pub chapa: ChapaConfig,
    pub rate_limit: RateLimitConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Public directory; receipts land in `<dir>/receipts`.
    pub dir: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapaConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    pub callback_url: Option<String>,
    pub return_url: Option<String>,
}

impl ChapaConfig {
    pub fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
}

impl BmsConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = match env::var("ENVIRONMENT") {
            Ok(environment) => environment == "prod",
            Err(_) => common_config.is_production(),
        };

        Ok(BmsConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("bms"), is_prod)?,
            },
            session: SessionConfig {
                ttl_hours: parse_env("SESSION_TTL_HOURS", 24)?,
                cookie_secure: parse_env("SESSION_COOKIE_SECURE", is_prod)?,
            },
            uploads: UploadConfig {
                dir: get_env("UPLOAD_DIR", Some("public/uploads"), false)?,
                max_bytes: parse_env("UPLOAD_MAX_BYTES", 10 * 1024 * 1024)?,
            },
            chapa: ChapaConfig {
                base_url: get_env("CHAPA_BASE_URL", Some("https://api.chapa.co/v1"), false)?,
                secret_key: Secret::new(env::var("CHAPA_SECRET_KEY").unwrap_or_default()),
                callback_url: env::var("CHAPA_CALLBACK_URL").ok(),
                return_url: env::var("CHAPA_RETURN_URL").ok(),
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_env("LOGIN_RATE_LIMIT_ATTEMPTS", 10)?,
                login_window_seconds: parse_env("LOGIN_RATE_LIMIT_WINDOW_SECONDS", 60)?,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_env_falls_back_to_default_outside_prod() {
        let value = get_env("BMS_TEST_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn get_env_requires_value_in_prod() {
        let err = get_env("BMS_TEST_UNSET_KEY", Some("fallback"), true).unwrap_err();
        assert!(err.to_string().contains("required in production"));
    }

    #[test]
    fn parse_env_uses_default_when_missing() {
        let value: u64 = parse_env("BMS_TEST_UNSET_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }
}
