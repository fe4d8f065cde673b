use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub image_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub presign_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub gemini: GeminiConfig,
    pub storage: StorageConfig,
    /// Lets `/api/auth/register` honour `role: "admin"` in the request body.
    pub allow_admin_registration: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = require_env("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: require_env("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "stylist".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "stylist-users".into()),
            ttl_minutes: parse_env("JWT_TTL_MINUTES", 60 * 24 * 7),
        };
        let gemini = GeminiConfig {
            api_key: require_env("GEMINI_API_KEY")?,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into()),
            image_model: std::env::var("GEMINI_IMAGE_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-image-preview".into()),
            timeout_secs: parse_env("GEMINI_TIMEOUT_SECS", 120),
        };
        let storage = StorageConfig {
            endpoint: require_env("MINIO_ENDPOINT")?,
            bucket: require_env("MINIO_BUCKET")?,
            access_key: require_env("MINIO_ACCESS_KEY")?,
            secret_key: require_env("MINIO_SECRET_KEY")?,
            presign_ttl_secs: parse_env("PRESIGN_TTL_SECS", 30 * 60),
        };
        let allow_admin_registration = std::env::var("ALLOW_ADMIN_REGISTRATION")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            jwt,
            gemini,
            storage,
            allow_admin_registration,
        })
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_on_garbage() {
        std::env::set_var("STYLIST_TEST_PARSE_ENV", "not-a-number");
        assert_eq!(parse_env("STYLIST_TEST_PARSE_ENV", 42_i64), 42);
        std::env::set_var("STYLIST_TEST_PARSE_ENV", "7");
        assert_eq!(parse_env("STYLIST_TEST_PARSE_ENV", 42_i64), 7);
    }

    #[test]
    fn require_env_names_the_missing_variable() {
        let err = require_env("STYLIST_TEST_DEFINITELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("STYLIST_TEST_DEFINITELY_UNSET"));
    }
}
