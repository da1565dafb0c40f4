use std::env;

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,

    pub password_reset_ttl_secs: i64,
    /// Mail relay that receives issued reset tokens. Unset means debug log only.
    pub password_reset_webhook_url: Option<String>,
    pub auth_rate_limit_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_ttl_secs: env::var("JWT_TTL_SECS")
                .unwrap_or_else(|_| "3600".into())
                .parse()
                .expect("JWT_TTL_SECS must be a number"),

            password_reset_ttl_secs: env::var("PASSWORD_RESET_TTL_SECS")
                .unwrap_or_else(|_| "3600".into())
                .parse()
                .unwrap_or(3600),
            password_reset_webhook_url: env::var("PASSWORD_RESET_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            auth_rate_limit_per_minute: env::var("AUTH_RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Page the reset message links to; it posts the token back to
    /// `/v1/accounts/password-reset/confirm`.
    pub fn reset_page_url(&self) -> String {
        format!("{}/reset-password", self.frontend_url.trim_end_matches('/'))
    }
}

/// Client-side settings for [`crate::client::MoodLens`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    /// Serve repeated history reads from memory until the next write.
    pub history_cache: bool,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            backend_url: env::var("MOODLENS_BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            history_cache: env::var("MOODLENS_HISTORY_CACHE")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
        }
    }
}
