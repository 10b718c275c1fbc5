/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Token configuration (per-kind secrets, expiry durations).
    pub auth: AuthConfig,
}

/// Token signing and lifetime configuration.
///
/// Staff and student tokens are signed with DIFFERENT secrets so a token
/// minted for one population can never verify against the other.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for staff tokens (`STAFF_TOKEN_SECRET`, required).
    pub staff_token_secret: String,
    /// HMAC secret for student tokens (`STUDENT_TOKEN_SECRET`, required).
    pub student_token_secret: String,
    /// Staff access token lifetime in minutes (default: `15`).
    pub staff_access_ttl_mins: i64,
    /// Student access token lifetime in minutes (default: `30`).
    pub student_access_ttl_mins: i64,
    /// Refresh token / session lifetime in days, both kinds (default: `30`).
    pub refresh_ttl_days: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `3000`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                    |
    /// | `STAFF_TOKEN_SECRET`       | (required)              |
    /// | `STUDENT_TOKEN_SECRET`     | (required)              |
    /// | `STAFF_ACCESS_TTL_MINS`    | `15`                    |
    /// | `STUDENT_ACCESS_TTL_MINS`  | `30`                    |
    /// | `REFRESH_TTL_DAYS`         | `30`                    |
    ///
    /// Panics on missing secrets or unparseable values; misconfiguration
    /// should fail fast at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            auth: AuthConfig::from_env(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let staff_token_secret =
            std::env::var("STAFF_TOKEN_SECRET").expect("STAFF_TOKEN_SECRET must be set");
        let student_token_secret =
            std::env::var("STUDENT_TOKEN_SECRET").expect("STUDENT_TOKEN_SECRET must be set");
        assert_ne!(
            staff_token_secret, student_token_secret,
            "STAFF_TOKEN_SECRET and STUDENT_TOKEN_SECRET must differ"
        );

        let staff_access_ttl_mins: i64 = std::env::var("STAFF_ACCESS_TTL_MINS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("STAFF_ACCESS_TTL_MINS must be a valid i64");

        let student_access_ttl_mins: i64 = std::env::var("STUDENT_ACCESS_TTL_MINS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("STUDENT_ACCESS_TTL_MINS must be a valid i64");

        let refresh_ttl_days: i64 = std::env::var("REFRESH_TTL_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REFRESH_TTL_DAYS must be a valid i64");

        Self {
            staff_token_secret,
            student_token_secret,
            staff_access_ttl_mins,
            student_access_ttl_mins,
            refresh_ttl_days,
        }
    }
}
