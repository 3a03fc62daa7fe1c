use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Prefix for generated license keys (e.g. "BB" -> "BB-PRO-XXXX-XXXX-XXXX")
    pub license_key_prefix: String,
    /// Origins allowed to call the admin API. The public verify endpoint
    /// is exempt and accepts any origin.
    pub cors_allowed_origins: Vec<String>,
    /// General rate limit: one request token replenished every N seconds
    pub rate_limit_replenish_secs: u64,
    pub rate_limit_burst: u32,
    /// Verification rate limit: one token replenished every N milliseconds
    pub verify_rate_limit_replenish_ms: u64,
    pub verify_rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3010);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]);

        // Defaults: ~100 requests per 15 minutes on admin endpoints, 300 per
        // minute on verification. Zero would make the limiter unbuildable.
        let rate_limit_replenish_secs: u64 = env::var("RATE_LIMIT_REPLENISH_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9)
            .max(1);
        let rate_limit_burst: u32 = env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100)
            .max(1);
        let verify_rate_limit_replenish_ms: u64 = env::var("VERIFY_RATE_LIMIT_REPLENISH_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200)
            .max(1);
        let verify_rate_limit_burst: u32 = env::var("VERIFY_RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300)
            .max(1);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "blockbuilder.db".to_string()),
            license_key_prefix: env::var("LICENSE_KEY_PREFIX")
                .unwrap_or_else(|_| "BB".to_string()),
            cors_allowed_origins,
            rate_limit_replenish_secs,
            rate_limit_burst,
            verify_rate_limit_replenish_ms,
            verify_rate_limit_burst,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
