use std::env;
use std::net::SocketAddr;

/// Process-wide configuration loaded from the environment: `BOT_TOKEN`,
/// `DATABASE_URL`, and the rest of the service's runtime knobs.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bot_token: String,
    pub tg_api_id: i32,
    pub tg_api_hash: String,
    pub webhook_secret: String,
    pub token_signing_key: String,
    pub token_lifetime_secs: i64,
    pub bind_addr: SocketAddr,
    pub artifact_root: String,
    pub health_check_interval_secs: u64,
    pub default_destination_rate_limit: f64,
    pub default_destination_burst: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable not set")?;
        let bot_token =
            env::var("BOT_TOKEN").map_err(|_| "BOT_TOKEN environment variable is required")?;
        let tg_api_id = env::var("TG_API_ID")
            .map_err(|_| "TG_API_ID not set in environment")?
            .parse::<i32>()
            .map_err(|_| "TG_API_ID must be a valid integer")?;
        let tg_api_hash =
            env::var("TG_API_HASH").map_err(|_| "TG_API_HASH not set in environment")?;
        let webhook_secret = env::var("WEBHOOK_SECRET")
            .map_err(|_| "WEBHOOK_SECRET environment variable is required")?;
        let token_signing_key = env::var("TOKEN_SIGNING_KEY")
            .map_err(|_| "TOKEN_SIGNING_KEY environment variable is required")?;
        let token_lifetime_secs = env::var("TOKEN_LIFETIME_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24 * 3600);
        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| format!("invalid BIND_ADDR: {e}"))?;
        let artifact_root = env::var("ARTIFACT_ROOT").unwrap_or_else(|_| "storage".to_string());
        let health_check_interval_secs = env::var("HEALTH_CHECK_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let default_destination_rate_limit = env::var("DESTINATION_RATE_LIMIT_PER_MIN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20.0);
        let default_destination_burst = env::var("DESTINATION_RATE_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20.0);

        Ok(Self {
            database_url,
            bot_token,
            tg_api_id,
            tg_api_hash,
            webhook_secret,
            token_signing_key,
            token_lifetime_secs,
            bind_addr,
            artifact_root,
            health_check_interval_secs,
            default_destination_rate_limit,
            default_destination_burst,
        })
    }
}
