use serde::Deserialize;
use std::env;

use crate::models::review::MAX_REVIEW_WINDOW_DAYS;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub redis_uri: String,
    pub relay: RelayConfig,
    pub review: ReviewConfig,
    /// Wrong answers to the same question before the mentor is notified.
    pub failure_threshold: u32,
    pub session_ttl_seconds: u64,
    /// `user:password` pair for Basic auth on `/metrics`.
    pub metrics_auth: String,
}

/// Outbound n8n webhook targets, one per relay action.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub chat_url: String,
    pub review_exercises_url: String,
    pub failure_streak_url: String,
    /// `None` leaves the transport default in place.
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    pub window_days: i64,
    pub min_errors: u32,
    pub max_candidates: usize,
    /// Days since the last failure before a topic is due. 0 = due immediately.
    pub due_after_days: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chat_url: "http://localhost:5678/webhook/mentor-chat".to_string(),
            review_exercises_url: "http://localhost:5678/webhook/review-exercises".to_string(),
            failure_streak_url: "http://localhost:5678/webhook/failure-streak".to_string(),
            timeout_seconds: None,
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_errors: 2,
            max_candidates: 10,
            due_after_days: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "aprueba".to_string(),
            redis_uri: "redis://127.0.0.1:6379/0".to_string(),
            relay: RelayConfig::default(),
            review: ReviewConfig::default(),
            failure_threshold: 3,
            session_ttl_seconds: 3600,
            metrics_auth: "admin:changeme".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml first, APP_ prefixed environment overrides on top
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let string_setting = |key: &str, env_key: &str, default: &str| -> String {
            settings
                .get_string(key)
                .or_else(|_| env::var(env_key))
                .unwrap_or_else(|_| default.to_string())
        };

        let bind_addr = string_setting("server.bind_addr", "BIND_ADDR", &defaults.bind_addr);
        let mongo_uri = string_setting("database.mongo_uri", "MONGO_URI", &defaults.mongo_uri);
        let mongo_database = string_setting(
            "database.mongo_database",
            "MONGO_DATABASE",
            &defaults.mongo_database,
        );
        let redis_uri = string_setting("redis.uri", "REDIS_URI", &defaults.redis_uri);

        let relay = RelayConfig {
            chat_url: string_setting(
                "relay.chat_url",
                "N8N_CHAT_WEBHOOK_URL",
                &defaults.relay.chat_url,
            ),
            review_exercises_url: string_setting(
                "relay.review_exercises_url",
                "N8N_REVIEW_WEBHOOK_URL",
                &defaults.relay.review_exercises_url,
            ),
            failure_streak_url: string_setting(
                "relay.failure_streak_url",
                "N8N_MENTORING_WEBHOOK_URL",
                &defaults.relay.failure_streak_url,
            ),
            timeout_seconds: settings
                .get_int("relay.timeout_seconds")
                .ok()
                .filter(|v| *v > 0)
                .map(|v| v as u64),
        };

        let review = ReviewConfig {
            window_days: settings
                .get_int("review.window_days")
                .ok()
                .filter(|v| (1..=MAX_REVIEW_WINDOW_DAYS).contains(v))
                .unwrap_or(defaults.review.window_days),
            min_errors: settings
                .get_int("review.min_errors")
                .ok()
                .filter(|v| *v >= 0)
                .map(|v| v as u32)
                .unwrap_or(defaults.review.min_errors),
            max_candidates: settings
                .get_int("review.max_candidates")
                .ok()
                .filter(|v| *v > 0)
                .map(|v| v as usize)
                .unwrap_or(defaults.review.max_candidates),
            due_after_days: settings
                .get_int("review.due_after_days")
                .ok()
                .filter(|v| *v >= 0)
                .unwrap_or(defaults.review.due_after_days),
        };

        let failure_threshold = settings
            .get_int("mentoring.failure_threshold")
            .ok()
            .filter(|v| *v > 0)
            .map(|v| v as u32)
            .unwrap_or(defaults.failure_threshold);

        let session_ttl_seconds = settings
            .get_int("session.ttl_seconds")
            .ok()
            .or_else(|| {
                env::var("SESSION_DURATION_SECONDS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
            })
            .filter(|v| *v > 0)
            .map(|v| v as u64)
            .unwrap_or(defaults.session_ttl_seconds);

        let metrics_auth = string_setting("metrics.auth", "METRICS_AUTH", &defaults.metrics_auth);

        if app_env == "prod" && metrics_auth == defaults.metrics_auth {
            tracing::warn!("METRICS_AUTH is using the development default in production");
        }

        Ok(Config {
            bind_addr,
            mongo_uri,
            mongo_database,
            redis_uri,
            relay,
            review,
            failure_threshold,
            session_ttl_seconds,
            metrics_auth,
        })
    }
}
